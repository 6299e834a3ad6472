//! Image classification/detection bridge over a compiled inference model.
//!
//! A [`ModelHandle`] owns one loaded model. Each call decodes an image,
//! fits it to the model's declared input tensor via the `preprocess` crate,
//! runs the backend and returns every output tensor keyed by index.

pub mod backend;
pub mod config;
pub mod error;
pub mod handle;
pub mod logging;
pub mod metrics;
pub mod output;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, RawTensor, TensorData, TensorInfo};
pub use config::{InferenceConfig, RunOptions};
pub use error::InferenceError;
pub use handle::{HandleStatus, ModelHandle};
pub use output::{OutputPolicy, OutputTensor, OutputTensorSet};

#[cfg(feature = "ort-backend")]
pub use backend::ort::OrtBackend;

/// Load compiled model bytes on the ONNX Runtime backend.
#[cfg(feature = "ort-backend")]
pub fn load(model: &[u8], num_threads: usize) -> Result<ModelHandle<OrtBackend>, InferenceError> {
    ModelHandle::load(model, num_threads)
}

/// Release the model behind `handle`. Safe to call repeatedly.
pub fn close<B: InferenceBackend>(handle: &ModelHandle<B>) {
    handle.close();
}

/// Run the image at `image_path` through the model behind `handle`.
pub fn run_inference<B: InferenceBackend>(
    handle: &ModelHandle<B>,
    image_path: &str,
    rotation_degrees: i32,
    mean: f32,
    std: f32,
) -> Result<OutputTensorSet, InferenceError> {
    handle.run_inference(image_path, rotation_degrees, mean, std)
}
