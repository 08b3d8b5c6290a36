// THEORY:
// The `FeatureBuilder` decides which three numbers describe a pixel before PCA sees
// it. Two feature spaces exist:
//
// - `Color`: the adapted RGB triple, untouched.
// - `LuminanceGradient`: (Rec. 601 gray, Sobel d/dx, Sobel d/dy). Each gradient
//   channel is min-max stretched onto 0..=255 on its own and truncated to u8, so the
//   three channels share a comparable range and PCA weighs structure against tone.
//   A gradient channel with no spread (a flat image) becomes all zeros.
//   Borders are mirrored without repeating the edge pixel (reflect-101), so the
//   derivative across an image edge is zero rather than half a step.

use crate::core_modules::color_adapter;
use crate::pipeline::InputType;
use image::imageops::crop_imm;
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

pub type Gradient = ImageBuffer<Luma<i16>, Vec<i16>>;

pub fn build_features(rgb: &RgbImage, input_type: InputType) -> RgbImage {
    match input_type {
        InputType::Color => rgb.clone(),
        InputType::LuminanceGradient => luminance_gradient(rgb),
    }
}

/// Stacks (gray, gradient-x, gradient-y) into one 3-channel image.
pub fn luminance_gradient(rgb: &RgbImage) -> RgbImage {
    let (width, height) = rgb.dimensions();
    let gray = color_adapter::luminance(rgb);
    let (sobel_x, sobel_y) = reflect_101_sobel(&gray);
    let gradient_x = rescale_to_byte(sobel_x.as_raw());
    let gradient_y = rescale_to_byte(sobel_y.as_raw());

    let mut features = RgbImage::new(width, height);
    for (i, (pixel, luma)) in features.pixels_mut().zip(gray.iter()).enumerate() {
        *pixel = Rgb([*luma, gradient_x[i], gradient_y[i]]);
    }
    features
}

/// 3x3 Sobel d/dx and d/dy over a reflect-101 padded copy of `gray`.
pub fn reflect_101_sobel(gray: &GrayImage) -> (Gradient, Gradient) {
    let (width, height) = gray.dimensions();
    let padded = GrayImage::from_fn(width + 2, height + 2, |x, y| {
        let source_x = reflect_101(x as i64 - 1, width as i64);
        let source_y = reflect_101(y as i64 - 1, height as i64);
        *gray.get_pixel(source_x as u32, source_y as u32)
    });
    let gradient_x = horizontal_sobel(&padded);
    let gradient_y = vertical_sobel(&padded);
    (
        crop_imm(&gradient_x, 1, 1, width, height).to_image(),
        crop_imm(&gradient_y, 1, 1, width, height).to_image(),
    )
}

fn reflect_101(index: i64, len: i64) -> i64 {
    if len == 1 {
        0
    } else if index < 0 {
        -index
    } else if index >= len {
        2 * len - 2 - index
    } else {
        index
    }
}

/// Min-max stretch onto 0..=255, truncating.
fn rescale_to_byte(values: &[i16]) -> Vec<u8> {
    let Some(&min) = values.iter().min() else {
        return Vec::new();
    };
    let max = values.iter().copied().max().unwrap_or(min);
    if max == min {
        return vec![0; values.len()];
    }
    let span = (max as i32 - min as i32) as f64;
    values
        .iter()
        .map(|&v| ((v as i32 - min as i32) as f64 * 255.0 / span) as u8)
        .collect()
}
