// THEORY:
// The `PCAProjector` re-expresses every pixel's 3-vector along the axes of maximum
// variance of the whole image.
//
// Key architectural principles:
// 1.  **All pixels fit the model**: the mean and covariance are taken over every
//     pixel, masked or not. The mask only matters later, when the enhancer decides
//     which projected values to normalize.
// 2.  **Closed-form 3x3 decomposition**: with three features the covariance is a 3x3
//     symmetric matrix, so an exact symmetric eigen-decomposition in f64 replaces an
//     iterative SVD.
// 3.  **Deterministic axes**: eigen solvers return eigenpairs in no particular order
//     and with arbitrary signs. Components are sorted by descending eigenvalue (ties
//     keep solver order), and each is flipped so its largest-magnitude loading is
//     positive. The same input always yields the same projection, bit for bit.

use crate::error::{Result, ScoreError};
use image::RgbImage;
use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use tracing::debug;

pub const LINEARIZE_GAMMA: f64 = 2.2;
pub const COMPONENT_COUNT: usize = 3;

pub type FeatureVector = [f64; COMPONENT_COUNT];

/// Flattens the feature image into [0, 1] vectors, gamma-decoding when `linearize` is set.
pub fn feature_matrix(features: &RgbImage, linearize: bool) -> Vec<FeatureVector> {
    features
        .pixels()
        .map(|p| {
            let mut row = [0.0; COMPONENT_COUNT];
            for (slot, &channel) in row.iter_mut().zip(p.0.iter()) {
                let normalized = channel as f64 / 255.0;
                *slot = if linearize {
                    normalized.powf(LINEARIZE_GAMMA)
                } else {
                    normalized
                };
            }
            row
        })
        .collect()
}

/// True where the pixel is not pure black. Taken from the adapted RGB image, so
/// transparent and black background stays out of every feature space.
pub fn pixel_mask(rgb: &RgbImage) -> Vec<bool> {
    rgb.pixels().map(|p| p.0.iter().any(|&c| c > 0)).collect()
}

/// A fitted 3-component decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalComponents {
    pub mean: FeatureVector,
    /// Unit-length axes, ordered by descending explained variance.
    pub components: [FeatureVector; COMPONENT_COUNT],
    pub explained_variance: FeatureVector,
}

impl PrincipalComponents {
    pub fn fit(samples: &[FeatureVector]) -> Self {
        let count = samples.len();

        let mut mean = [0.0; COMPONENT_COUNT];
        for sample in samples {
            for (acc, value) in mean.iter_mut().zip(sample.iter()) {
                *acc += value;
            }
        }
        if count > 0 {
            for acc in mean.iter_mut() {
                *acc /= count as f64;
            }
        }

        let mut covariance = Matrix3::<f64>::zeros();
        for sample in samples {
            let centered = Vector3::new(
                sample[0] - mean[0],
                sample[1] - mean[1],
                sample[2] - mean[2],
            );
            covariance += centered * centered.transpose();
        }
        let divisor = if count > 1 { (count - 1) as f64 } else { 1.0 };
        covariance /= divisor;

        let eigen = SymmetricEigen::new(covariance);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut components = [[0.0; COMPONENT_COUNT]; COMPONENT_COUNT];
        let mut explained_variance = [0.0; COMPONENT_COUNT];
        for (rank, &axis) in order.iter().enumerate() {
            let column = eigen.eigenvectors.column(axis);
            let mut direction = [column[0], column[1], column[2]];
            if direction.iter().any(|v| !v.is_finite()) {
                direction = [0.0; COMPONENT_COUNT];
                direction[rank] = 1.0;
            }
            orient(&mut direction);
            components[rank] = direction;
            explained_variance[rank] = eigen.eigenvalues[axis].max(0.0);
        }

        debug!(
            samples = count,
            ?explained_variance,
            "fitted principal components"
        );

        Self {
            mean,
            components,
            explained_variance,
        }
    }

    /// Scores every sample on the 1-indexed `component`.
    pub fn project(&self, samples: &[FeatureVector], component: u8) -> Result<Vec<f64>> {
        let axis = match component {
            1..=3 => &self.components[component as usize - 1],
            _ => {
                return Err(ScoreError::invalid(format!(
                    "component must be 1, 2 or 3 (got {component})"
                )));
            }
        };
        Ok(samples
            .iter()
            .map(|sample| {
                (0..COMPONENT_COUNT)
                    .map(|i| (sample[i] - self.mean[i]) * axis[i])
                    .sum::<f64>()
            })
            .collect())
    }
}

/// Flips `direction` so its largest-magnitude loading is positive.
fn orient(direction: &mut FeatureVector) {
    let mut dominant = 0;
    for i in 1..COMPONENT_COUNT {
        if direction[i].abs() > direction[dominant].abs() {
            dominant = i;
        }
    }
    if direction[dominant] < 0.0 {
        for value in direction.iter_mut() {
            *value = -*value;
        }
    }
}
