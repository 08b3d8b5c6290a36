// THEORY:
// The `ColorAdapter` is the single entry point for pixel data. Whatever the decoder
// handed us (gray, gray+alpha, RGB, RGBA, 16-bit, float) leaves this module as a
// plain 8-bit RGB grid of the same size, and every later stage can assume exactly
// three channels.
//
// Transparency is resolved by compositing onto pure black. Fully transparent pixels
// therefore become (0, 0, 0), which is what the PCA mask later treats as
// "no content". The blend is done in f32 and truncated, never rounded.
//
// It also hosts the Rec. 601 luminance used by both pipelines, so the noise map and
// the luminance/gradient features agree on what "gray" means. The weights are the
// 14-bit fixed-point ones common image libraries use (4899, 9617, 1868, summing to
// 1 << 14), rounded with a half-unit bias before the shift.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, RgbaImage};

const LUMA_SHIFT: u32 = 14;
const LUMA_RED: u32 = 4899;
const LUMA_GREEN: u32 = 9617;
const LUMA_BLUE: u32 = 1868;

/// Normalizes any decoded image into 8-bit RGB, compositing alpha onto black.
pub fn adapt(image: &DynamicImage) -> RgbImage {
    if image.color().has_alpha() {
        composite_on_black(&image.to_rgba8())
    } else {
        image.to_rgb8()
    }
}

/// `out = trunc(alpha / 255 * rgb)` per channel; the black background contributes nothing.
pub fn composite_on_black(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        Rgb([
            (r as f32 * alpha) as u8,
            (g as f32 * alpha) as u8,
            (b as f32 * alpha) as u8,
        ])
    })
}

/// Rec. 601 luminance of a single pixel on the 0..255 scale.
pub fn pixel_luminance(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0.map(u32::from);
    let weighted = LUMA_RED * r + LUMA_GREEN * g + LUMA_BLUE * b + (1 << (LUMA_SHIFT - 1));
    (weighted >> LUMA_SHIFT) as u8
}

/// Rec. 601 grayscale conversion.
pub fn luminance(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    GrayImage::from_fn(width, height, |x, y| Luma([pixel_luminance(rgb.get_pixel(x, y))]))
}
