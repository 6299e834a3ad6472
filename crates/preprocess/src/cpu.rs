use crate::bitmap::Image;
use crate::config::PreprocessOptions;
use crate::error::PreprocessError;
use crate::pack::{PackedInput, pack};
use crate::resample::resample;
use crate::tensor::{ElementType, InputTensorSpec};
use crate::transform::build_transform;
use common::span;

/// Decode -> transform -> resample -> pack, on the calling thread.
#[derive(Debug, Clone, Default)]
pub struct CpuPreProcessor {
    options: PreprocessOptions,
}

impl CpuPreProcessor {
    pub fn new(options: PreprocessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    /// Decode the image at `path` (optionally a `file://` URI) and pack it.
    pub fn preprocess_path(
        &self,
        path: &str,
        spec: &InputTensorSpec,
    ) -> Result<PackedInput, PreprocessError> {
        let image = Image::open(path)?;
        self.preprocess(&image, spec)
    }

    pub fn preprocess(
        &self,
        image: &Image,
        spec: &InputTensorSpec,
    ) -> Result<PackedInput, PreprocessError> {
        let _s = span!("preprocess_image");

        // Uint8 inputs carry the raw channel byte and never read mean/std.
        if spec.element_type == ElementType::Float32 {
            self.options.normalization.validate()?;
        }

        tracing::trace!(
            src_width = image.width(),
            src_height = image.height(),
            dst_width = spec.width,
            dst_height = spec.height,
            rotation = self.options.rotation_degrees,
            "Preprocessing image"
        );

        let transform = build_transform(
            image.width(),
            image.height(),
            spec.width,
            spec.height,
            self.options.maintain_aspect_ratio,
            self.options.rotation_degrees,
        );

        let pixels = resample(
            image,
            &transform,
            spec.width,
            spec.height,
            self.options.interpolation,
        );

        Ok(pack(&pixels, spec, &self.options.normalization))
    }
}
