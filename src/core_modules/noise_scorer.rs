// THEORY:
// The `NoiseScorer` collapses the equalized noise map to one number. The three
// channels are merged with the same Rec. 601 weights used everywhere else, the mean
// gray value is the raw noise level, and that level is mapped linearly onto a 10..0
// scale that saturates at `noise_threshold`.

use crate::core_modules::color_adapter;
use image::RgbImage;

pub const MAX_SCORE: f64 = 10.0;

/// Mean Rec. 601 gray value of the noise map.
pub fn raw_noise_level(noise_map: &RgbImage) -> f64 {
    let gray = color_adapter::luminance(noise_map);
    let count = gray.len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.iter().map(|&v| v as u64).sum();
    sum as f64 / count as f64
}

/// `10 * (1 - min(raw / threshold, 1))`, clamped to [0, 10].
pub fn score_from_level(raw_noise_level: f64, noise_threshold: f64) -> f64 {
    let ratio = (raw_noise_level / noise_threshold).min(1.0);
    (MAX_SCORE * (1.0 - ratio)).clamp(0.0, MAX_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn black_map_is_noise_free() {
        let map = RgbImage::new(8, 8);
        assert_eq!(raw_noise_level(&map), 0.0);
        assert_eq!(score_from_level(0.0, 20.0), 10.0);
    }

    #[test]
    fn level_is_mean_gray() {
        let mut map = RgbImage::new(2, 1);
        map.put_pixel(0, 0, Rgb([255, 255, 255]));
        assert_eq!(raw_noise_level(&map), 127.5);
    }

    #[test]
    fn score_saturates_at_threshold() {
        assert_eq!(score_from_level(20.0, 20.0), 0.0);
        assert_eq!(score_from_level(500.0, 20.0), 0.0);
        assert!((score_from_level(5.0, 20.0) - 7.5).abs() < 1e-12);
    }

    #[test]
    fn score_never_increases_with_noise() {
        let mut previous = f64::INFINITY;
        for step in 0..400 {
            let level = step as f64 * 0.25;
            let score = score_from_level(level, 20.0);
            assert!(score <= previous);
            assert!((0.0..=10.0).contains(&score));
            previous = score;
        }
    }
}
