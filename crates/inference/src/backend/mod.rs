use crate::error::InferenceError;
use preprocess::{DataType, PackedInput};

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Declared shape and element type of a model tensor.
///
/// Dimensions `<= 0` are dynamic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    pub dims: Vec<i64>,
    pub data_type: DataType,
}

impl TensorInfo {
    pub fn new(dims: impl Into<Vec<i64>>, data_type: DataType) -> Self {
        Self {
            dims: dims.into(),
            data_type,
        }
    }

    /// Whether a concrete shape fits this declaration.
    pub fn accepts(&self, shape: &[usize]) -> bool {
        self.dims.len() == shape.len()
            && self
                .dims
                .iter()
                .zip(shape)
                .all(|(&declared, &actual)| declared <= 0 || declared as usize == actual)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Float32(Vec<f32>),
    Uint8(Vec<u8>),
    Int64(Vec<i64>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            TensorData::Float32(v) => v.len(),
            TensorData::Uint8(v) => v.len(),
            TensorData::Int64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One output tensor as produced by a backend, before shaping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
    pub shape: Vec<usize>,
    pub data: TensorData,
}

/// The native inference engine a model handle drives.
///
/// Implementations are used from one thread at a time; the handle serializes
/// every call.
pub trait InferenceBackend: Send {
    /// Build an engine from compiled model bytes.
    fn load_model(model: &[u8], num_threads: usize) -> Result<Self, InferenceError>
    where
        Self: Sized;

    /// First (image) input of the model.
    fn input_info(&self) -> Result<TensorInfo, InferenceError>;

    /// All outputs, in declaration order.
    fn output_infos(&self) -> Result<Vec<TensorInfo>, InferenceError>;

    /// Run the model on a packed input. Returns one tensor per declared output,
    /// in declaration order.
    fn infer(&mut self, input: &PackedInput) -> Result<Vec<RawTensor>, InferenceError>;
}
