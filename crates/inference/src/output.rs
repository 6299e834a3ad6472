use crate::backend::{RawTensor, TensorData, TensorInfo};
use crate::error::InferenceError;
use ndarray::{ArrayD, IxDyn};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Output tensors keyed by declaration index.
pub type OutputTensorSet = BTreeMap<usize, OutputTensor>;

/// Element type returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputPolicy {
    /// Every output converted to f32, whatever the engine produced.
    #[default]
    Float,
    /// Keep the engine's element type.
    Native,
}

impl FromStr for OutputPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "float" | "f32" => Ok(Self::Float),
            "native" => Ok(Self::Native),
            other => Err(format!("unknown output policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputTensor {
    Float32(ArrayD<f32>),
    Uint8(ArrayD<u8>),
    Int64(ArrayD<i64>),
}

impl OutputTensor {
    pub fn shape(&self) -> &[usize] {
        match self {
            OutputTensor::Float32(a) => a.shape(),
            OutputTensor::Uint8(a) => a.shape(),
            OutputTensor::Int64(a) => a.shape(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OutputTensor::Float32(a) => a.len(),
            OutputTensor::Uint8(a) => a.len(),
            OutputTensor::Int64(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            OutputTensor::Float32(a) => Some(a),
            _ => None,
        }
    }

    /// Convert to f32, casting integer elements.
    pub fn into_f32(self) -> ArrayD<f32> {
        match self {
            OutputTensor::Float32(a) => a,
            OutputTensor::Uint8(a) => a.mapv(f32::from),
            OutputTensor::Int64(a) => a.mapv(|v| v as f32),
        }
    }

    /// Shape a raw backend tensor against its declaration.
    pub(crate) fn from_raw(
        index: usize,
        raw: RawTensor,
        declared: &TensorInfo,
        policy: OutputPolicy,
    ) -> Result<Self, InferenceError> {
        let mismatch = |actual: Vec<i64>| InferenceError::ShapeMismatch {
            tensor: format!("output {index}"),
            expected: declared.dims.clone(),
            actual,
        };

        if !declared.accepts(&raw.shape) {
            return Err(mismatch(raw.shape.iter().map(|&d| d as i64).collect()));
        }

        let expected_len: usize = raw.shape.iter().product();
        if raw.data.len() != expected_len {
            return Err(mismatch(vec![raw.data.len() as i64]));
        }

        let shape = IxDyn(&raw.shape);
        let tensor = match raw.data {
            TensorData::Float32(v) => ArrayD::from_shape_vec(shape, v).map(OutputTensor::Float32),
            TensorData::Uint8(v) => ArrayD::from_shape_vec(shape, v).map(OutputTensor::Uint8),
            TensorData::Int64(v) => ArrayD::from_shape_vec(shape, v).map(OutputTensor::Int64),
        }
        .map_err(|e| InferenceError::inference(e.to_string()))?;

        Ok(match policy {
            OutputPolicy::Float => OutputTensor::Float32(tensor.into_f32()),
            OutputPolicy::Native => tensor,
        })
    }
}
