use crate::error::PreprocessError;
use std::fmt;

/// Element type of a tensor as declared by a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Float32,
    Uint8,
    Int64,
    Other(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Float32 => f.write_str("float32"),
            DataType::Uint8 => f.write_str("uint8"),
            DataType::Int64 => f.write_str("int64"),
            DataType::Other(name) => f.write_str(name),
        }
    }
}

/// Encodings the packer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// Normalized `(value - mean) / std`, native-endian f32.
    Float32,
    /// Raw channel byte.
    Uint8,
}

impl ElementType {
    pub fn width(&self) -> usize {
        match self {
            ElementType::Float32 => 4,
            ElementType::Uint8 => 1,
        }
    }
}

impl TryFrom<&DataType> for ElementType {
    type Error = PreprocessError;

    fn try_from(value: &DataType) -> Result<Self, Self::Error> {
        match value {
            DataType::Float32 => Ok(ElementType::Float32),
            DataType::Uint8 => Ok(ElementType::Uint8),
            other => Err(PreprocessError::UnsupportedTensorType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `[1, H, W, C]`, channels interleaved per pixel.
    Nhwc,
    /// `[1, C, H, W]`, one plane per channel.
    Nchw,
}

/// Channel count the packer writes per pixel (R, G, B).
pub const RGB_CHANNELS: usize = 3;

/// Model input tensor, reduced to what packing needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTensorSpec {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub element_type: ElementType,
    pub layout: Layout,
}

impl InputTensorSpec {
    /// Interpret a declared input shape and element type.
    ///
    /// The batch dimension may be dynamic (`<= 0`) and is treated as 1.
    /// Spatial dimensions must be static.
    pub fn from_declared(dims: &[i64], data_type: &DataType) -> Result<Self, PreprocessError> {
        let element_type = ElementType::try_from(data_type)?;

        let unsupported = || PreprocessError::UnsupportedInputShape(dims.to_vec());

        let [batch, d1, d2, d3] = dims else {
            return Err(unsupported());
        };
        if *batch > 1 {
            return Err(unsupported());
        }

        let (height, width, layout) = if *d3 == RGB_CHANNELS as i64 {
            (*d1, *d2, Layout::Nhwc)
        } else if *d1 == RGB_CHANNELS as i64 {
            (*d2, *d3, Layout::Nchw)
        } else {
            return Err(unsupported());
        };

        let width = u32::try_from(width).ok().filter(|&w| w > 0).ok_or_else(unsupported)?;
        let height = u32::try_from(height).ok().filter(|&h| h > 0).ok_or_else(unsupported)?;

        Ok(Self {
            width,
            height,
            channels: RGB_CHANNELS,
            element_type,
            layout,
        })
    }

    pub fn nhwc(width: u32, height: u32, element_type: ElementType) -> Self {
        Self {
            width,
            height,
            channels: RGB_CHANNELS,
            element_type,
            layout: Layout::Nhwc,
        }
    }

    /// Tensor shape in declaration order, batch fixed to 1.
    pub fn shape(&self) -> [usize; 4] {
        let (w, h, c) = (self.width as usize, self.height as usize, self.channels);
        match self.layout {
            Layout::Nhwc => [1, h, w, c],
            Layout::Nchw => [1, c, h, w],
        }
    }

    pub fn element_count(&self) -> usize {
        self.width as usize * self.height as usize * self.channels
    }

    pub fn byte_len(&self) -> usize {
        self.element_count() * self.element_type.width()
    }
}

/// Per-channel `(value - mean) / std`, applied to raw 0..=255 channel values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    pub const DEFAULT_MEAN: f32 = 127.5;
    pub const DEFAULT_STD: f32 = 127.5;

    pub fn uniform(mean: f32, std: f32) -> Self {
        Self {
            mean: [mean; 3],
            std: [std; 3],
        }
    }

    pub fn validate(&self) -> Result<(), PreprocessError> {
        if let Some(m) = self.mean.iter().find(|m| !m.is_finite()) {
            return Err(PreprocessError::InvalidNormalization(format!(
                "mean must be finite, got {m}"
            )));
        }
        if let Some(s) = self.std.iter().find(|s| !s.is_finite() || **s == 0.0) {
            return Err(PreprocessError::InvalidNormalization(format!(
                "std must be finite and non-zero, got {s}"
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn apply(&self, channel: usize, value: u8) -> f32 {
        (value as f32 - self.mean[channel]) / self.std[channel]
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT_MEAN, Self::DEFAULT_STD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nhwc_float_input() {
        let spec = InputTensorSpec::from_declared(&[1, 224, 320, 3], &DataType::Float32).unwrap();
        assert_eq!(spec.layout, Layout::Nhwc);
        assert_eq!((spec.width, spec.height), (320, 224));
        assert_eq!(spec.shape(), [1, 224, 320, 3]);
        assert_eq!(spec.byte_len(), 224 * 320 * 3 * 4);
    }

    #[test]
    fn test_nchw_uint8_input() {
        let spec = InputTensorSpec::from_declared(&[1, 3, 64, 48], &DataType::Uint8).unwrap();
        assert_eq!(spec.layout, Layout::Nchw);
        assert_eq!((spec.width, spec.height), (48, 64));
        assert_eq!(spec.shape(), [1, 3, 64, 48]);
        assert_eq!(spec.byte_len(), 64 * 48 * 3);
    }

    #[test]
    fn test_dynamic_batch_is_treated_as_one() {
        let spec = InputTensorSpec::from_declared(&[-1, 4, 4, 3], &DataType::Float32).unwrap();
        assert_eq!(spec.shape(), [1, 4, 4, 3]);
    }

    #[test]
    fn test_unsupported_shapes_rejected() {
        for dims in [
            vec![1, 224, 224],
            vec![1, 224, 224, 1],
            vec![1, -1, -1, 3],
            vec![2, 4, 4, 3],
            vec![1, 3, 0, 8],
        ] {
            let result = InputTensorSpec::from_declared(&dims, &DataType::Float32);
            assert!(
                matches!(result, Err(PreprocessError::UnsupportedInputShape(ref d)) if *d == dims),
                "{dims:?} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn test_unsupported_element_type_rejected() {
        let result = InputTensorSpec::from_declared(&[1, 4, 4, 3], &DataType::Int64);
        assert!(matches!(result, Err(PreprocessError::UnsupportedTensorType(ref t)) if t == "int64"));

        let result =
            InputTensorSpec::from_declared(&[1, 4, 4, 3], &DataType::Other("float16".into()));
        assert!(matches!(result, Err(PreprocessError::UnsupportedTensorType(ref t)) if t == "float16"));
    }

    #[test]
    fn test_normalization_validation() {
        assert!(Normalization::default().validate().is_ok());
        assert!(Normalization::uniform(0.0, 1.0).validate().is_ok());
        assert!(Normalization::uniform(0.0, 0.0).validate().is_err());
        assert!(Normalization::uniform(f32::NAN, 1.0).validate().is_err());
        assert!(Normalization::uniform(0.0, f32::INFINITY).validate().is_err());
    }

    #[test]
    fn test_default_normalization_maps_bytes_into_unit_range() {
        let norm = Normalization::default();
        assert_eq!(norm.apply(0, 0), -1.0);
        assert_eq!(norm.apply(1, 255), 1.0);
        for v in 0..=255u8 {
            let f = norm.apply(2, v);
            assert!((-1.0..=1.0).contains(&f));
        }
    }
}
