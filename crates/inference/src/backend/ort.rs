use super::{InferenceBackend, RawTensor, TensorData, TensorInfo};
use crate::error::InferenceError;
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    tensor::TensorElementType,
    value::{DynValue, TensorRef, ValueType},
};
use preprocess::{DataType, ElementType, PackedInput};
use std::fmt::Display;

/// ONNX Runtime engine on the CPU execution provider.
pub struct OrtBackend {
    session: Session,
}

impl OrtBackend {
    fn declared_outputs(&self) -> Vec<(String, TensorInfo)> {
        self.session
            .outputs()
            .iter()
            .map(|o| (o.name().to_string(), tensor_info(o.dtype())))
            .collect()
    }
}

impl InferenceBackend for OrtBackend {
    fn load_model(model: &[u8], num_threads: usize) -> Result<Self, InferenceError> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let session = Session::builder()
            .map_err(load_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_error)?
            .with_intra_threads(num_threads)
            .map_err(load_error)?
            .commit_from_memory(model)
            .map_err(load_error)?;

        if session.inputs().is_empty() {
            return Err(InferenceError::model_load("model declares no inputs"));
        }

        tracing::info!(
            model_bytes = model.len(),
            num_threads,
            inputs = session.inputs().len(),
            outputs = session.outputs().len(),
            "ONNX Runtime session created"
        );

        Ok(Self { session })
    }

    fn input_info(&self) -> Result<TensorInfo, InferenceError> {
        self.session
            .inputs()
            .first()
            .map(|input| tensor_info(input.dtype()))
            .ok_or_else(|| InferenceError::inference("model declares no inputs"))
    }

    fn output_infos(&self) -> Result<Vec<TensorInfo>, InferenceError> {
        Ok(self
            .declared_outputs()
            .into_iter()
            .map(|(_, info)| info)
            .collect())
    }

    fn infer(&mut self, input: &PackedInput) -> Result<Vec<RawTensor>, InferenceError> {
        let declared = self.input_info()?;
        let shape = input.shape();
        let dims: Vec<i64> = shape.iter().map(|&d| d as i64).collect();

        if !declared.accepts(&shape) {
            return Err(InferenceError::ShapeMismatch {
                tensor: "input".to_string(),
                expected: declared.dims,
                actual: dims,
            });
        }

        let output_names: Vec<String> = self
            .declared_outputs()
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        match input.element_type() {
            ElementType::Float32 => {
                let data = input.to_f32_vec().unwrap_or_default();
                let tensor =
                    TensorRef::from_array_view((dims, data.as_slice())).map_err(run_error)?;
                let outputs = self
                    .session
                    .run(ort::inputs![tensor])
                    .map_err(run_error)?;
                output_names
                    .iter()
                    .map(|name| extract(&outputs[name.as_str()]))
                    .collect()
            }
            ElementType::Uint8 => {
                let tensor =
                    TensorRef::from_array_view((dims, input.as_bytes())).map_err(run_error)?;
                let outputs = self
                    .session
                    .run(ort::inputs![tensor])
                    .map_err(run_error)?;
                output_names
                    .iter()
                    .map(|name| extract(&outputs[name.as_str()]))
                    .collect()
            }
        }
    }
}

fn load_error(e: impl Display) -> InferenceError {
    InferenceError::model_load(e.to_string())
}

fn run_error(e: impl Display) -> InferenceError {
    InferenceError::inference(e.to_string())
}

fn tensor_info(value_type: &ValueType) -> TensorInfo {
    match value_type {
        ValueType::Tensor { ty, shape, .. } => {
            let data_type = match ty {
                TensorElementType::Float32 => DataType::Float32,
                TensorElementType::Uint8 => DataType::Uint8,
                TensorElementType::Int64 => DataType::Int64,
                other => DataType::Other(format!("{other:?}").to_lowercase()),
            };
            TensorInfo::new(shape.iter().copied().collect::<Vec<i64>>(), data_type)
        }
        other => TensorInfo::new(Vec::new(), DataType::Other(format!("{other:?}"))),
    }
}

fn extract(value: &DynValue) -> Result<RawTensor, InferenceError> {
    if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
        return Ok(RawTensor {
            shape: to_shape(shape.iter()),
            data: TensorData::Float32(data.to_vec()),
        });
    }
    if let Ok((shape, data)) = value.try_extract_tensor::<u8>() {
        return Ok(RawTensor {
            shape: to_shape(shape.iter()),
            data: TensorData::Uint8(data.to_vec()),
        });
    }
    if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
        return Ok(RawTensor {
            shape: to_shape(shape.iter()),
            data: TensorData::Int64(data.to_vec()),
        });
    }

    Err(InferenceError::inference(format!(
        "unsupported output value type {:?}",
        value.dtype()
    )))
}

fn to_shape<'a>(dims: impl Iterator<Item = &'a i64>) -> Vec<usize> {
    dims.map(|&d| d.max(0) as usize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ort::value::{Shape, SymbolicDimensions};

    fn tensor_type(ty: TensorElementType, dims: &[i64]) -> ValueType {
        ValueType::Tensor {
            ty,
            shape: Shape::new(dims.iter().copied()),
            dimension_symbols: SymbolicDimensions::empty(dims.len()),
        }
    }

    #[test]
    fn test_tensor_info_maps_supported_types() {
        let info = tensor_info(&tensor_type(TensorElementType::Float32, &[1, 224, 224, 3]));
        assert_eq!(info.dims, vec![1, 224, 224, 3]);
        assert_eq!(info.data_type, DataType::Float32);

        let info = tensor_info(&tensor_type(TensorElementType::Uint8, &[-1, 3, 32, 32]));
        assert_eq!(info.dims, vec![-1, 3, 32, 32]);
        assert_eq!(info.data_type, DataType::Uint8);

        let info = tensor_info(&tensor_type(TensorElementType::Int64, &[5]));
        assert_eq!(info.data_type, DataType::Int64);
    }

    #[test]
    fn test_tensor_info_names_other_element_types() {
        let info = tensor_info(&tensor_type(TensorElementType::Float16, &[1, 8]));
        assert_eq!(info.dims, vec![1, 8]);
        assert_eq!(info.data_type, DataType::Other("float16".to_string()));
    }

    #[test]
    fn test_tensor_info_non_tensor_value_has_no_dims() {
        let sequence = ValueType::Sequence(Box::new(tensor_type(TensorElementType::Float32, &[2])));
        let info = tensor_info(&sequence);

        assert!(info.dims.is_empty());
        assert!(matches!(info.data_type, DataType::Other(_)));
    }

    #[test]
    fn test_to_shape_clamps_dynamic_dims() {
        let dims = [1i64, -1, 7, 0];
        assert_eq!(to_shape(dims.iter()), vec![1, 0, 7, 0]);
    }

    #[test]
    fn test_error_helpers_pick_variant() {
        assert!(matches!(load_error("bad graph"), InferenceError::ModelLoad { .. }));
        assert!(matches!(run_error("bad input"), InferenceError::Inference { .. }));
    }

    // Needs the ONNX Runtime shared library at test time.
    #[cfg(feature = "ci")]
    #[test]
    fn test_malformed_model_bytes_fail_to_load() {
        let result = OrtBackend::load_model(b"not an onnx model", 1);
        assert!(matches!(result, Err(InferenceError::ModelLoad { .. })));
    }
}
