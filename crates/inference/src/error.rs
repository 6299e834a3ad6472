use crate::handle::HandleStatus;
use preprocess::PreprocessError;
use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to load model: {source}")]
    ModelLoad {
        #[source]
        source: BoxError,
    },

    #[error("Thread count must be at least 1, got {0}")]
    InvalidThreadCount(usize),

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Unsupported input tensor type: {0}")]
    UnsupportedTensorType(String),

    #[error("Unsupported input tensor shape {0:?}")]
    UnsupportedInputShape(Vec<i64>),

    #[error("Invalid normalization: {0}")]
    InvalidNormalization(String),

    #[error("Shape mismatch for {tensor}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        tensor: String,
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    #[error("Model handle is {state}, inference requires a loaded model")]
    HandleState { state: HandleStatus },

    #[error("Inference failed: {source}")]
    Inference {
        #[source]
        source: BoxError,
    },

    #[error("Model handle lock poisoned")]
    Poisoned,
}

impl InferenceError {
    pub fn model_load(source: impl Into<BoxError>) -> Self {
        Self::ModelLoad {
            source: source.into(),
        }
    }

    pub fn inference(source: impl Into<BoxError>) -> Self {
        Self::Inference {
            source: source.into(),
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelLoad { .. } => "model_load",
            Self::InvalidThreadCount(_) => "invalid_thread_count",
            Self::ImageDecode { .. } => "image_decode",
            Self::InvalidImage(_) => "invalid_image",
            Self::UnsupportedTensorType(_) => "unsupported_tensor_type",
            Self::UnsupportedInputShape(_) => "unsupported_input_shape",
            Self::InvalidNormalization(_) => "invalid_normalization",
            Self::ShapeMismatch { .. } => "shape_mismatch",
            Self::HandleState { .. } => "handle_state",
            Self::Inference { .. } => "inference",
            Self::Poisoned => "poisoned",
        }
    }
}

impl From<PreprocessError> for InferenceError {
    fn from(err: PreprocessError) -> Self {
        match err {
            PreprocessError::ImageDecode { path, source } => Self::ImageDecode { path, source },
            PreprocessError::InvalidImage(msg) => Self::InvalidImage(msg),
            PreprocessError::UnsupportedTensorType(ty) => Self::UnsupportedTensorType(ty),
            PreprocessError::UnsupportedInputShape(dims) => Self::UnsupportedInputShape(dims),
            PreprocessError::InvalidNormalization(msg) => Self::InvalidNormalization(msg),
        }
    }
}
