use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
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

    #[error("Unsupported input tensor shape {0:?}: expected [1, H, W, 3] or [1, 3, H, W]")]
    UnsupportedInputShape(Vec<i64>),

    #[error("Invalid normalization: {0}")]
    InvalidNormalization(String),
}
