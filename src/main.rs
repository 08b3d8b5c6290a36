// Command-line runner for the `kuro_score` library: decodes one image, scores it and
// prints the result as JSON. Optional flags write the intermediate maps as PNG.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use kuro_score::core_modules::utils::image_helper::image_helper::{save_gray_png, save_rgb_png};
use kuro_score::pipeline::{DEFAULT_GAMMA, DEFAULT_KERNEL_SIZE, DEFAULT_NOISE_THRESHOLD};
use kuro_score::{Enhancement, InputType, NoiseConfig, NoiseScore, PcaConfig, PcaScore, ScoringService};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Analysis {
    Noise,
    Pca,
    All,
}

#[derive(Debug, Parser)]
#[command(name = "kuro-score", version, about = "Score an image for noise and tonal structure")]
struct Args {
    /// Image file to score.
    image: PathBuf,

    /// Which analysis to run.
    #[arg(long, value_enum, default_value_t = Analysis::All)]
    only: Analysis,

    /// Median-filter aperture (odd).
    #[arg(long, default_value_t = DEFAULT_KERNEL_SIZE)]
    kernel_size: u32,

    #[arg(long, default_value_t = DEFAULT_NOISE_THRESHOLD)]
    noise_threshold: f64,

    /// Principal component to score (1-3).
    #[arg(long, default_value_t = 1)]
    component: u8,

    /// `color` or `luminance_gradient`.
    #[arg(long, default_value = "color")]
    input_type: String,

    /// Gamma-decode features before PCA.
    #[arg(long)]
    linearize: bool,

    #[arg(long)]
    invert: bool,

    /// `equalize`, or anything else for a min-max stretch.
    #[arg(long, default_value = "equalize")]
    enhancement: String,

    #[arg(long, default_value_t = DEFAULT_GAMMA)]
    gamma: f64,

    /// Write the equalized noise map here (PNG).
    #[arg(long)]
    noise_map: Option<PathBuf>,

    /// Write the enhanced PCA field here (PNG).
    #[arg(long)]
    pca_map: Option<PathBuf>,

    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn noise_config(&self) -> NoiseConfig {
        NoiseConfig {
            kernel_size: self.kernel_size,
            noise_threshold: self.noise_threshold,
        }
    }

    fn pca_config(&self) -> Result<PcaConfig> {
        Ok(PcaConfig {
            component: self.component,
            input_type: self.input_type.parse::<InputType>()?,
            linearize: self.linearize,
            invert: self.invert,
            enhancement: Enhancement::from(self.enhancement.as_str()),
            gamma: self.gamma,
        })
    }
}

fn report_noise(args: &Args, result: &NoiseScore, report: &mut Map<String, Value>) -> Result<()> {
    if let Some(path) = &args.noise_map {
        save_rgb_png(path, &result.noise_map)
            .with_context(|| format!("failed to write noise map to {}", path.display()))?;
        info!(path = %path.display(), "wrote noise map");
    }
    report.insert(
        "noise".to_string(),
        json!({ "score": result.score, "raw_noise": result.raw_noise_level }),
    );
    Ok(())
}

fn report_pca(args: &Args, result: &PcaScore, report: &mut Map<String, Value>) -> Result<()> {
    if let Some(path) = &args.pca_map {
        save_gray_png(path, &result.field)
            .with_context(|| format!("failed to write PCA map to {}", path.display()))?;
        info!(path = %path.display(), "wrote PCA map");
    }
    report.insert("pca".to_string(), json!({ "score": result.score }));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let noise = args.noise_config();
    let pca = args.pca_config()?;
    noise.validate()?;
    pca.validate()?;

    let image = image::open(&args.image)
        .with_context(|| format!("failed to decode {}", args.image.display()))?;
    info!(
        path = %args.image.display(),
        width = image.width(),
        height = image.height(),
        "scoring image"
    );
    let image = Arc::new(image);
    let service = ScoringService::new();

    let mut report = Map::new();
    let file_name = args
        .image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    report.insert("file".to_string(), json!(file_name));

    match args.only {
        Analysis::Noise => {
            let result = service.score_noise(image, noise).await?;
            report_noise(&args, &result, &mut report)?;
        }
        Analysis::Pca => {
            let result = service.score_pca(image, pca).await?;
            report_pca(&args, &result, &mut report)?;
        }
        Analysis::All => {
            let scores = service.score_all(image, noise, pca).await?;
            report_noise(&args, &scores.noise, &mut report)?;
            report_pca(&args, &scores.pca, &mut report)?;
        }
    }

    let output = Value::Object(report);
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");
    Ok(())
}
