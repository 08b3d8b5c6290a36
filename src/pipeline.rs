// THEORY:
// The `pipeline` module is the top-level API of the scoring engine. It wires the
// core modules into the two independent pipelines and exposes them as pure
// functions over an explicit configuration value:
//
//   image -> ColorAdapter -> NoiseMapper -> NoiseScorer                    => NoiseScore
//   image -> ColorAdapter -> FeatureBuilder -> PCAProjector
//                         -> ComponentEnhancer -> PCAScorer                => PcaScore
//
// Nothing here keeps state between calls. Configurations are validated up front, so
// a bad option fails before any pixel work and a run either fully succeeds or fully
// fails. The `*_adapted` variants take an already adapted RGB image. Validation
// happens once per public call; `run_noise` and `run_pca` assume a checked config,
// which lets the async facade validate and adapt once before fanning out.

use crate::core_modules::{
    color_adapter, component_enhancer, feature_builder, noise_mapper, noise_scorer,
    pca_projector::{self, PrincipalComponents},
    pca_scorer,
};
use crate::error::{Result, ScoreError};
use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_KERNEL_SIZE: u32 = 3;
pub const DEFAULT_NOISE_THRESHOLD: f64 = 20.0;
pub const DEFAULT_COMPONENT: u8 = 1;
pub const DEFAULT_GAMMA: f64 = 1.0;

/// Feature space submitted to PCA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InputType {
    #[default]
    Color,
    LuminanceGradient,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Color => "color",
            InputType::LuminanceGradient => "luminance_gradient",
        }
    }
}

impl FromStr for InputType {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "color" => Ok(InputType::Color),
            "luminance_gradient" => Ok(InputType::LuminanceGradient),
            other => Err(ScoreError::invalid(format!(
                "input_type must be 'color' or 'luminance_gradient' (got '{other}')"
            ))),
        }
    }
}

impl TryFrom<String> for InputType {
    type Error = ScoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<InputType> for String {
    fn from(value: InputType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the selected component is normalized. Any name other than `equalize`
/// selects the min-max stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Enhancement {
    #[default]
    Equalize,
    MinMax,
}

impl Enhancement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Enhancement::Equalize => "equalize",
            Enhancement::MinMax => "minmax",
        }
    }
}

impl From<&str> for Enhancement {
    fn from(value: &str) -> Self {
        if value == "equalize" {
            Enhancement::Equalize
        } else {
            Enhancement::MinMax
        }
    }
}

impl From<String> for Enhancement {
    fn from(value: String) -> Self {
        Enhancement::from(value.as_str())
    }
}

impl From<Enhancement> for String {
    fn from(value: Enhancement) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Enhancement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the noise pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Median-filter aperture. Must be odd and at least 1.
    pub kernel_size: u32,
    /// Raw noise level at which the score bottoms out at 0.
    pub noise_threshold: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            kernel_size: DEFAULT_KERNEL_SIZE,
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(ScoreError::invalid(format!(
                "kernel_size must be an odd integer >= 1 (got {})",
                self.kernel_size
            )));
        }
        if !(self.noise_threshold.is_finite() && self.noise_threshold > 0.0) {
            return Err(ScoreError::invalid(format!(
                "noise_threshold must be a positive number (got {})",
                self.noise_threshold
            )));
        }
        Ok(())
    }
}

/// Configuration for the PCA pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaConfig {
    /// 1-indexed principal axis, 1 to 3.
    pub component: u8,
    pub input_type: InputType,
    /// Gamma-decode features (`x^2.2`) before the decomposition.
    pub linearize: bool,
    pub invert: bool,
    pub enhancement: Enhancement,
    /// Exponent applied to the enhanced field. Must be positive.
    pub gamma: f64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            component: DEFAULT_COMPONENT,
            input_type: InputType::default(),
            linearize: false,
            invert: false,
            enhancement: Enhancement::default(),
            gamma: DEFAULT_GAMMA,
        }
    }
}

impl PcaConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=3).contains(&self.component) {
            return Err(ScoreError::invalid(format!(
                "component must be 1, 2 or 3 (got {})",
                self.component
            )));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(ScoreError::invalid(format!(
                "gamma must be a positive number (got {})",
                self.gamma
            )));
        }
        Ok(())
    }
}

/// Result of the noise pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct NoiseScore {
    pub score: f64,
    pub raw_noise_level: f64,
    /// Equalized residual map, for display only.
    #[serde(skip)]
    pub noise_map: RgbImage,
}

/// Result of the PCA pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PcaScore {
    pub score: f64,
    /// Number of pixels that took part in the enhancement.
    pub masked_pixels: usize,
    /// The 8-bit enhanced field the score was read from.
    #[serde(skip)]
    pub field: GrayImage,
}

/// Both scores for one image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageScores {
    pub noise: NoiseScore,
    pub pca: PcaScore,
}

fn ensure_not_empty(rgb: &RgbImage) -> Result<()> {
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(ScoreError::EmptyImage { width, height });
    }
    Ok(())
}

pub fn score_noise(image: &DynamicImage, config: &NoiseConfig) -> Result<NoiseScore> {
    config.validate()?;
    run_noise(&color_adapter::adapt(image), config)
}

/// Noise pipeline over an image already passed through the `ColorAdapter`.
pub fn score_noise_adapted(rgb: &RgbImage, config: &NoiseConfig) -> Result<NoiseScore> {
    config.validate()?;
    run_noise(rgb, config)
}

pub(crate) fn run_noise(rgb: &RgbImage, config: &NoiseConfig) -> Result<NoiseScore> {
    ensure_not_empty(rgb)?;

    let noise_map = noise_mapper::build_noise_map(rgb, config.kernel_size);
    let raw_noise_level = noise_scorer::raw_noise_level(&noise_map);
    let score = noise_scorer::score_from_level(raw_noise_level, config.noise_threshold);
    debug!(raw_noise_level, score, "noise score");

    Ok(NoiseScore {
        score,
        raw_noise_level,
        noise_map,
    })
}

pub fn score_pca(image: &DynamicImage, config: &PcaConfig) -> Result<PcaScore> {
    config.validate()?;
    run_pca(&color_adapter::adapt(image), config)
}

/// PCA pipeline over an image already passed through the `ColorAdapter`.
pub fn score_pca_adapted(rgb: &RgbImage, config: &PcaConfig) -> Result<PcaScore> {
    config.validate()?;
    run_pca(rgb, config)
}

pub(crate) fn run_pca(rgb: &RgbImage, config: &PcaConfig) -> Result<PcaScore> {
    ensure_not_empty(rgb)?;
    let (width, height) = rgb.dimensions();

    // The mask follows the composited colors, whatever feature space PCA runs in.
    let mask = pca_projector::pixel_mask(rgb);
    let features = feature_builder::build_features(rgb, config.input_type);
    let samples = pca_projector::feature_matrix(&features, config.linearize);

    let model = PrincipalComponents::fit(&samples);
    let projection = model.project(&samples, config.component)?;

    let enhanced = component_enhancer::enhance(
        &projection,
        &mask,
        config.component,
        config.enhancement,
        config.gamma,
    );
    let bytes = component_enhancer::to_bytes(&enhanced, config.invert);
    let score = pca_scorer::score_field(&bytes);

    let masked_pixels = mask.iter().filter(|&&keep| keep).count();
    debug!(
        component = config.component,
        input_type = %config.input_type,
        enhancement = %config.enhancement,
        masked_pixels,
        score,
        "pca score"
    );

    let field = GrayImage::from_raw(width, height, bytes)
        .ok_or(ScoreError::EmptyImage { width, height })?;
    Ok(PcaScore {
        score,
        masked_pixels,
        field,
    })
}

/// Runs both pipelines on one image, sequentially.
pub fn score_image(
    image: &DynamicImage,
    noise: &NoiseConfig,
    pca: &PcaConfig,
) -> Result<ImageScores> {
    noise.validate()?;
    pca.validate()?;
    let rgb = color_adapter::adapt(image);
    Ok(ImageScores {
        noise: run_noise(&rgb, noise)?,
        pca: run_pca(&rgb, pca)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn solid_red() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([255, 0, 0])))
    }

    /// Deterministic speckle over a soft gradient.
    fn textured(width: u32, height: u32) -> DynamicImage {
        let mut state = 0x2545_f491u32;
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let jitter = (state % 48) as u8;
            Rgb([
                (x * 2) as u8 / 2 + jitter,
                (y * 2) as u8 / 2 + jitter / 2,
                100u8.saturating_add(jitter),
            ])
        }))
    }

    #[test]
    fn solid_red_is_noise_free() {
        let result = score_noise(&solid_red(), &NoiseConfig::default()).unwrap();
        assert_eq!(result.score, 10.0);
        assert_eq!(result.raw_noise_level, 0.0);
        assert_eq!(result.noise_map.dimensions(), (100, 100));
    }

    #[test]
    fn speckle_lowers_the_noise_score() {
        let result = score_noise(&textured(64, 64), &NoiseConfig::default()).unwrap();
        assert!(result.raw_noise_level > 0.0);
        assert!(result.score < 10.0);
        assert!(result.score >= 0.0);
    }

    #[test]
    fn solid_red_pca_is_stable() {
        let config = PcaConfig::default();
        let first = score_pca(&solid_red(), &config).unwrap();
        let second = score_pca(&solid_red(), &config).unwrap();

        assert_eq!(first.masked_pixels, 100 * 100);
        assert!((0.0..=10.0).contains(&first.score));
        assert_eq!(first.score.to_bits(), second.score.to_bits());
        assert_eq!(first.field, second.field);
        assert!(first.score.abs() < 1e-9);
    }

    #[test]
    fn black_image_scores_ten() {
        let black = DynamicImage::ImageRgb8(RgbImage::new(32, 32));
        let result = score_pca(&black, &PcaConfig::default()).unwrap();
        assert_eq!(result.masked_pixels, 0);
        assert!(result.field.iter().all(|&v| v == 0));
        assert_eq!(result.score, 10.0);
    }

    #[test]
    fn transparent_image_scores_ten() {
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 0])));
        for input_type in [InputType::Color, InputType::LuminanceGradient] {
            let config = PcaConfig {
                input_type,
                ..PcaConfig::default()
            };
            let result = score_pca(&clear, &config).unwrap();
            assert_eq!(result.masked_pixels, 0);
            assert_eq!(result.score, 10.0);
        }
    }

    #[test]
    fn black_background_stays_out_of_the_gradient_mask() {
        let mut rgb = RgbImage::new(40, 40);
        for y in 15..25 {
            for x in 15..25 {
                rgb.put_pixel(x, y, Rgb([140, 140, 140]));
            }
        }
        let config = PcaConfig {
            input_type: InputType::LuminanceGradient,
            ..PcaConfig::default()
        };
        let result = score_pca(&DynamicImage::ImageRgb8(rgb), &config).unwrap();
        assert_eq!(result.masked_pixels, 100);
        assert_eq!(result.field.get_pixel(0, 0).0, [0]);
    }

    #[test]
    fn gradient_mask_counts_only_non_black_pixels() {
        let rgb = RgbImage::from_fn(20, 10, |x, _| {
            if x < 10 { Rgb([0, 0, 0]) } else { Rgb([(x * 12) as u8, 40, 90]) }
        });
        let non_black = rgb.pixels().filter(|p| p.0 != [0, 0, 0]).count();
        let config = PcaConfig {
            input_type: InputType::LuminanceGradient,
            component: 2,
            ..PcaConfig::default()
        };
        let result = score_pca(&DynamicImage::ImageRgb8(rgb), &config).unwrap();
        assert_eq!(result.masked_pixels, non_black);
        assert_eq!(non_black, 100);
    }

    #[test]
    fn every_option_combination_stays_in_range() {
        let image = textured(48, 40);
        for component in 1..=3 {
            for input_type in [InputType::Color, InputType::LuminanceGradient] {
                for enhancement in [Enhancement::Equalize, Enhancement::MinMax] {
                    for (linearize, invert, gamma) in [(false, false, 1.0), (true, true, 0.5), (false, true, 2.2)] {
                        let config = PcaConfig {
                            component,
                            input_type,
                            linearize,
                            invert,
                            enhancement,
                            gamma,
                        };
                        let result = score_pca(&image, &config).unwrap();
                        assert!((0.0..=10.0).contains(&result.score), "{config:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn inversion_mirrors_the_field() {
        let image = textured(30, 30);
        let plain = score_pca(&image, &PcaConfig::default()).unwrap();
        let inverted = score_pca(
            &image,
            &PcaConfig {
                invert: true,
                ..PcaConfig::default()
            },
        )
        .unwrap();
        for (a, b) in plain.field.iter().zip(inverted.field.iter()) {
            assert_eq!(*a, 255 - *b);
        }
        assert!((plain.score + inverted.score - 10.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_unit_gamma_matches_default() {
        let image = textured(25, 25);
        let default = score_pca(&image, &PcaConfig::default()).unwrap();
        let explicit = score_pca(
            &image,
            &PcaConfig {
                gamma: 1.0,
                component: 2,
                ..PcaConfig::default()
            },
        )
        .unwrap();
        let implicit = score_pca(
            &image,
            &PcaConfig {
                component: 2,
                ..PcaConfig::default()
            },
        )
        .unwrap();
        assert_eq!(explicit.field, implicit.field);
        assert!((0.0..=10.0).contains(&default.score));
    }

    #[test]
    fn scoring_is_deterministic() {
        let image = textured(40, 40);
        let noise_a = score_noise(&image, &NoiseConfig::default()).unwrap();
        let noise_b = score_noise(&image, &NoiseConfig::default()).unwrap();
        assert_eq!(noise_a.score.to_bits(), noise_b.score.to_bits());
        assert_eq!(noise_a.raw_noise_level.to_bits(), noise_b.raw_noise_level.to_bits());
        assert_eq!(noise_a.noise_map, noise_b.noise_map);

        let config = PcaConfig {
            input_type: InputType::LuminanceGradient,
            component: 3,
            ..PcaConfig::default()
        };
        let pca_a = score_pca(&image, &config).unwrap();
        let pca_b = score_pca(&image, &config).unwrap();
        assert_eq!(pca_a.score.to_bits(), pca_b.score.to_bits());
    }

    #[test]
    fn unknown_input_type_is_rejected() {
        let parsed = "invalid".parse::<InputType>();
        assert!(matches!(parsed, Err(ScoreError::InvalidArgument(_))));

        let json = r#"{"input_type": "invalid"}"#;
        assert!(serde_json::from_str::<PcaConfig>(json).is_err());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let config: PcaConfig =
            serde_json::from_str(r#"{"input_type": "luminance_gradient", "enhancement": "stretch"}"#)
                .unwrap();
        assert_eq!(config.input_type, InputType::LuminanceGradient);
        assert_eq!(config.enhancement, Enhancement::MinMax);
        assert_eq!(config.component, 1);
        assert_eq!(config.gamma, 1.0);

        let noise: NoiseConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(noise, NoiseConfig::default());
    }

    #[test]
    fn out_of_domain_options_fail_early() {
        let image = solid_red();
        for kernel_size in [0, 2, 4] {
            let config = NoiseConfig {
                kernel_size,
                ..NoiseConfig::default()
            };
            assert!(matches!(score_noise(&image, &config), Err(ScoreError::InvalidArgument(_))));
        }
        let config = NoiseConfig {
            noise_threshold: 0.0,
            ..NoiseConfig::default()
        };
        assert!(score_noise(&image, &config).is_err());

        for component in [0, 4] {
            let config = PcaConfig {
                component,
                ..PcaConfig::default()
            };
            assert!(matches!(score_pca(&image, &config), Err(ScoreError::InvalidArgument(_))));
        }
        let config = PcaConfig {
            gamma: -1.0,
            ..PcaConfig::default()
        };
        assert!(score_pca(&image, &config).is_err());
    }

    #[test]
    fn empty_images_are_rejected() {
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 5));
        assert!(matches!(
            score_noise(&empty, &NoiseConfig::default()),
            Err(ScoreError::EmptyImage { width: 0, height: 5 })
        ));
        assert!(score_pca(&empty, &PcaConfig::default()).is_err());
    }

    #[test]
    fn combined_scoring_matches_individual_runs() {
        let image = textured(36, 28);
        let both = score_image(&image, &NoiseConfig::default(), &PcaConfig::default()).unwrap();
        let noise = score_noise(&image, &NoiseConfig::default()).unwrap();
        let pca = score_pca(&image, &PcaConfig::default()).unwrap();
        assert_eq!(both.noise.score, noise.score);
        assert_eq!(both.pca.score, pca.score);
    }
}
