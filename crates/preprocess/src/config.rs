use crate::resample::Interpolation;
use crate::tensor::Normalization;

/// Knobs for a single preprocessing call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessOptions {
    pub rotation_degrees: i32,
    /// Crop to fill (uniform scale) instead of stretching each axis.
    pub maintain_aspect_ratio: bool,
    pub interpolation: Interpolation,
    pub normalization: Normalization,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            rotation_degrees: 0,
            maintain_aspect_ratio: false,
            interpolation: Interpolation::default(),
            normalization: Normalization::default(),
        }
    }
}
