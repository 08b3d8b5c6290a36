// THEORY:
// The `ScoringService` is the async face of the engine, for callers that live on a
// tokio runtime (an HTTP handler, a job runner). The pipelines themselves stay
// synchronous and CPU-bound; this layer only decides *where* they run:
//
// 1.  **Off the reactor**: every pipeline runs inside `spawn_blocking`, so a large
//     image never stalls the async worker threads.
// 2.  **Bounded**: a semaphore sized to the number of CPUs caps how many pipelines
//     run at once. The permit moves into the blocking task, so it is held until the
//     computation actually finishes even if the awaiting future is dropped.
// 3.  **Fan-out**: `score_all` adapts the image once and runs the noise and PCA
//     pipelines side by side, joining them with `try_join`. Either failure fails the
//     whole call; there are no partial results.
//
// Results are bit-identical to the synchronous functions in `pipeline`.

use crate::core_modules::color_adapter;
use crate::error::{Result, ScoreError};
use crate::pipeline::{self, ImageScores, NoiseConfig, NoiseScore, PcaConfig, PcaScore};
use futures::future::try_join;
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::debug;

#[derive(Clone)]
pub struct ScoringService {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl Default for ScoringService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringService {
    /// One concurrent pipeline per logical CPU.
    pub fn new() -> Self {
        Self::with_limit(num_cpus::get())
    }

    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Stops accepting work. Calls already holding a permit run to completion.
    pub fn close(&self) {
        self.permits.close();
    }

    pub async fn score_noise(
        &self,
        image: Arc<DynamicImage>,
        config: NoiseConfig,
    ) -> Result<NoiseScore> {
        config.validate()?;
        let rgb = self.adapt(image).await?;
        self.run_noise(rgb, config).await
    }

    pub async fn score_pca(&self, image: Arc<DynamicImage>, config: PcaConfig) -> Result<PcaScore> {
        config.validate()?;
        let rgb = self.adapt(image).await?;
        self.run_pca(rgb, config).await
    }

    /// Both pipelines, concurrently, over one adapted copy of the image.
    pub async fn score_all(
        &self,
        image: Arc<DynamicImage>,
        noise: NoiseConfig,
        pca: PcaConfig,
    ) -> Result<ImageScores> {
        noise.validate()?;
        pca.validate()?;
        let rgb = self.adapt(image).await?;
        let (noise, pca) = try_join(self.run_noise(rgb.clone(), noise), self.run_pca(rgb, pca)).await?;
        Ok(ImageScores { noise, pca })
    }

    async fn adapt(&self, image: Arc<DynamicImage>) -> Result<Arc<RgbImage>> {
        self.run_blocking(move || Ok(Arc::new(color_adapter::adapt(&image))))
            .await
    }

    async fn run_noise(&self, rgb: Arc<RgbImage>, config: NoiseConfig) -> Result<NoiseScore> {
        self.run_blocking(move || pipeline::run_noise(&rgb, &config)).await
    }

    async fn run_pca(&self, rgb: Arc<RgbImage>, config: PcaConfig) -> Result<PcaScore> {
        self.run_blocking(move || pipeline::run_pca(&rgb, &config)).await
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScoreError::ServiceClosed)?;
        debug!(available = self.permits.available_permits(), "scoring job started");
        task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await?
    }
}
