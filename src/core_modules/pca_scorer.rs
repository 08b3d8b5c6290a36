// THEORY:
// The `PCAScorer` reads the enhanced 8-bit field as "how much of the image lights up
// on the chosen axis". 25.5 = 255 / 10, so an all-black field scores 10 and an
// all-white field scores 0.

use crate::core_modules::noise_scorer::MAX_SCORE;

const BYTES_PER_POINT: f64 = 25.5;

pub fn score_field(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return MAX_SCORE;
    }
    let sum: u64 = bytes.iter().map(|&b| b as u64).sum();
    let mean = sum as f64 / bytes.len() as f64;
    (MAX_SCORE - mean / BYTES_PER_POINT).clamp(0.0, MAX_SCORE)
}
