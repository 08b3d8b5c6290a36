// THEORY:
// The `ComponentEnhancer` turns a raw projection (signed, unbounded) into a displayable
// [0, 1] field and then an 8-bit map. Only masked pixels take part in the
// normalization; everything else is pinned to zero so black background never skews
// the distribution.
//
// - Equalize, component 1: equalize the signed scores. The first axis is usually
//   "overall brightness", and its sign carries meaning.
// - Equalize, components 2/3: equalize magnitudes. These axes are roughly zero-mean,
//   so |score| measures how strongly a pixel departs from the dominant trend.
// - MinMax: linear stretch of the observed range, left at zero when the range is empty.
//
// Gamma is applied to the whole field after scattering; inversion happens on bytes.

use crate::core_modules::histogram::histogram;
use crate::pipeline::Enhancement;

/// Normalizes the masked projection values into a full-length [0, 1] field.
pub fn enhance(
    projection: &[f64],
    mask: &[bool],
    component: u8,
    enhancement: Enhancement,
    gamma: f64,
) -> Vec<f64> {
    let mut field = vec![0.0; projection.len()];
    let pixels_of_interest: Vec<f64> = projection
        .iter()
        .zip(mask.iter())
        .filter_map(|(&value, &keep)| keep.then_some(value))
        .collect();

    if !pixels_of_interest.is_empty() {
        let enhanced = match enhancement {
            Enhancement::Equalize if component == 1 => histogram::equalize_f64(&pixels_of_interest),
            Enhancement::Equalize => {
                let magnitudes: Vec<f64> = pixels_of_interest.iter().map(|v| v.abs()).collect();
                histogram::equalize_f64(&magnitudes)
            }
            Enhancement::MinMax => min_max(&pixels_of_interest),
        };

        let targets = field
            .iter_mut()
            .zip(mask.iter())
            .filter_map(|(slot, &keep)| keep.then_some(slot));
        for (slot, value) in targets.zip(enhanced) {
            *slot = value;
        }
    }

    if gamma != 1.0 {
        for value in field.iter_mut() {
            *value = value.powf(gamma);
        }
    }
    field
}

fn min_max(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if max > min {
        values.iter().map(|v| (v - min) / (max - min)).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// `round(v * 255)`, optionally inverted.
pub fn to_bytes(field: &[f64], invert: bool) -> Vec<u8> {
    let mut bytes: Vec<u8> = field
        .iter()
        .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();
    if invert {
        invert_bytes(&mut bytes);
    }
    bytes
}

pub fn invert_bytes(bytes: &mut [u8]) {
    for byte in bytes.iter_mut() {
        *byte = 255 - *byte;
    }
}
