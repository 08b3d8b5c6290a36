// THEORY:
// The `NoiseMapper` estimates where the image deviates from a locally smooth version
// of itself. A median filter is a good "what the image would look like without
// speckle" reference: it preserves edges but removes isolated outliers, so the
// residual |original - denoised| concentrates on grain and salt-and-pepper noise.
//
// Steps:
// 1.  Median-filter every channel with an odd square aperture (edges replicated).
// 2.  Subtract in i16 so the difference never wraps, take the magnitude, store as u8.
// 3.  Equalize each channel's 256-bin histogram independently. The equalized map is
//     both the visual artifact handed back to callers and the input the
//     `NoiseScorer` averages.

use crate::core_modules::histogram::histogram;
use image::RgbImage;
use imageproc::filter::median_filter;
use tracing::debug;

/// Median-denoised copy of `rgb`. An aperture of 1 is the identity.
pub fn denoise(rgb: &RgbImage, kernel_size: u32) -> RgbImage {
    if kernel_size <= 1 {
        return rgb.clone();
    }
    let radius = kernel_size / 2;
    median_filter(rgb, radius, radius)
}

/// Per-channel `|original - denoised|`.
pub fn residual(original: &RgbImage, denoised: &RgbImage) -> RgbImage {
    let (width, height) = original.dimensions();
    let mut out = RgbImage::new(width, height);
    for ((dst, src), reference) in out
        .iter_mut()
        .zip(original.iter())
        .zip(denoised.iter())
    {
        let difference = *src as i16 - *reference as i16;
        *dst = difference.unsigned_abs() as u8;
    }
    out
}

/// Histogram-equalizes R, G and B independently.
pub fn equalize_channels(map: &RgbImage) -> RgbImage {
    let mut out = map.clone();
    for channel in 0..3 {
        let samples: Vec<u8> = map.pixels().map(|p| p.0[channel]).collect();
        let equalized = histogram::equalize_u8(&samples);
        for (pixel, value) in out.pixels_mut().zip(equalized) {
            pixel.0[channel] = value;
        }
    }
    out
}

/// Full noise map: denoise, residual magnitude, per-channel equalization.
pub fn build_noise_map(rgb: &RgbImage, kernel_size: u32) -> RgbImage {
    let denoised = denoise(rgb, kernel_size);
    let raw = residual(rgb, &denoised);
    debug!(
        kernel_size,
        peak_residual = raw.iter().copied().max().unwrap_or(0),
        "computed median residual"
    );
    equalize_channels(&raw)
}
