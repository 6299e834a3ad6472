//! Image-to-tensor preprocessing: geometric transform, resampling and packing
//! into the byte layout a model input tensor declares.

pub mod bitmap;
pub mod config;
pub mod cpu;
pub mod error;
pub mod pack;
pub mod resample;
pub mod tensor;
pub mod transform;

pub use bitmap::Image;
pub use config::PreprocessOptions;
pub use cpu::CpuPreProcessor;
pub use error::PreprocessError;
pub use pack::{PackedInput, pack};
pub use resample::{Interpolation, resample};
pub use tensor::{DataType, ElementType, InputTensorSpec, Layout, Normalization};
pub use transform::{AffineTransform, build_transform};
