// THEORY:
// This file is the entry point for the `kuro_score` library crate. It exposes two
// independent, deterministic image scorers, each returning a value in [0, 10]:
//
// - a noise score, read from the median-filter residual of the image, and
// - a tonal-structure score, read from one principal component of per-pixel
//   color or luminance/gradient features.
//
// `pipeline` is the synchronous API (configs, results, pure scoring functions),
// `parallel_pipeline` wraps it for async callers, and the numeric stages live in
// `core_modules`. Decoding, metadata and transport are left to the caller.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use error::{Result, ScoreError};
pub use parallel_pipeline::ScoringService;
pub use pipeline::{
    Enhancement, ImageScores, InputType, NoiseConfig, NoiseScore, PcaConfig, PcaScore,
    score_image, score_noise, score_pca,
};
