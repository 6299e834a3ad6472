use image::{Rgb, RgbImage};
use inference::{
    HandleStatus, InferenceBackend, InferenceConfig, InferenceError, ModelHandle, OutputPolicy,
    OutputTensor, RawTensor, RunOptions, TensorData, TensorInfo, close, logging::setup_logging,
    run_inference,
};
use preprocess::{DataType, ElementType, PackedInput};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Backend double that records every packed input and echoes a summary of it.
///
/// Output 0 is `[1, 10]` float: the first ten input elements as f32.
/// Output 1 is `[1, 2]` uint8 quantized scores.
struct RecordingBackend {
    input: TensorInfo,
    seen: Arc<Mutex<Vec<PackedInput>>>,
}

impl RecordingBackend {
    fn new(dims: [i64; 4], data_type: DataType) -> (Self, Arc<Mutex<Vec<PackedInput>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let backend = Self {
            input: TensorInfo::new(dims, data_type),
            seen: Arc::clone(&seen),
        };
        (backend, seen)
    }
}

impl InferenceBackend for RecordingBackend {
    fn load_model(_model: &[u8], _num_threads: usize) -> Result<Self, InferenceError> {
        Err(InferenceError::model_load("test backend is built directly"))
    }

    fn input_info(&self) -> Result<TensorInfo, InferenceError> {
        Ok(self.input.clone())
    }

    fn output_infos(&self) -> Result<Vec<TensorInfo>, InferenceError> {
        Ok(vec![
            TensorInfo::new([1, 10], DataType::Float32),
            TensorInfo::new([1, 2], DataType::Uint8),
        ])
    }

    fn infer(&mut self, input: &PackedInput) -> Result<Vec<RawTensor>, InferenceError> {
        self.seen.lock().unwrap().push(input.clone());

        let head: Vec<f32> = match input.element_type() {
            ElementType::Float32 => input.to_f32_vec().unwrap().into_iter().take(10).collect(),
            ElementType::Uint8 => input.as_bytes().iter().take(10).map(|&b| b as f32).collect(),
        };

        Ok(vec![
            RawTensor {
                shape: vec![1, 10],
                data: TensorData::Float32(head),
            },
            RawTensor {
                shape: vec![1, 2],
                data: TensorData::Uint8(vec![3, 250]),
            },
        ])
    }
}

fn write_png(dir: &std::path::Path, name: &str, width: u32, height: u32) -> String {
    let path = dir.join(name);
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 40) as u8, (y * 40) as u8, 200])
    });
    img.save(&path).unwrap();
    format!("file://{}", path.display())
}

#[test]
fn test_end_to_end_4x4_float_model_from_disk() {
    setup_logging(&InferenceConfig::default());

    let dir = tempdir().unwrap();
    let uri = write_png(dir.path(), "synthetic.png", 4, 4);

    let (backend, seen) = RecordingBackend::new([1, 4, 4, 3], DataType::Float32);
    let handle = ModelHandle::from_backend(backend, 1);

    let outputs = run_inference(&handle, &uri, 0, 0.0, 1.0).unwrap();

    // Exactly one packed input of 4*4*3 float32 elements.
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 192);
    assert_eq!(seen[0].shape(), [1, 4, 4, 3]);

    // mean=0, std=1 leaves raw channel values: pixel (0,0) then (1,0).
    let out0 = outputs[&0].as_f32().unwrap();
    assert_eq!(out0.shape(), &[1, 10]);
    assert_eq!(
        out0.as_slice().unwrap(),
        &[0.0, 0.0, 200.0, 40.0, 0.0, 200.0, 80.0, 0.0, 200.0, 120.0]
    );

    // Default policy converts the uint8 output to floats.
    assert_eq!(
        outputs[&1].as_f32().unwrap().as_slice().unwrap(),
        &[3.0, 250.0]
    );
}

#[test]
fn test_native_output_policy_keeps_uint8_scores() {
    let dir = tempdir().unwrap();
    let uri = write_png(dir.path(), "scores.png", 8, 8);

    let (backend, seen) = RecordingBackend::new([1, 4, 4, 3], DataType::Uint8);
    let handle = ModelHandle::from_backend(backend, 1);

    let options = RunOptions {
        output_policy: OutputPolicy::Native,
        ..RunOptions::default()
    };
    let outputs = handle.run(&uri, &options).unwrap();

    assert_eq!(seen.lock().unwrap()[0].len(), 4 * 4 * 3);
    assert!(matches!(outputs[&0], OutputTensor::Float32(_)));
    match &outputs[&1] {
        OutputTensor::Uint8(scores) => assert_eq!(scores.as_slice().unwrap(), &[3, 250]),
        other => panic!("Expected uint8 scores, got {other:?}"),
    }
}

#[test]
fn test_nchw_model_receives_planar_input() {
    let dir = tempdir().unwrap();
    let uri = write_png(dir.path(), "planar.png", 2, 2);

    let (backend, seen) = RecordingBackend::new([1, 3, 2, 2], DataType::Uint8);
    let handle = ModelHandle::from_backend(backend, 1);

    handle.run(&uri, &RunOptions::default()).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].shape(), [1, 3, 2, 2]);
    // R plane, G plane, B plane.
    assert_eq!(
        seen[0].as_bytes(),
        &[0, 40, 0, 40, 0, 0, 40, 40, 200, 200, 200, 200]
    );
}

#[test]
fn test_lifecycle_through_free_functions() {
    let dir = tempdir().unwrap();
    let uri = write_png(dir.path(), "lifecycle.png", 4, 4);

    let (backend, seen) = RecordingBackend::new([1, 4, 4, 3], DataType::Float32);
    let handle = ModelHandle::from_backend(backend, 1);
    assert_eq!(handle.status(), HandleStatus::Loaded);

    run_inference(&handle, &uri, 0, 127.5, 127.5).unwrap();
    close(&handle);
    close(&handle);

    let result = run_inference(&handle, &uri, 0, 127.5, 127.5);
    assert!(matches!(
        result,
        Err(InferenceError::HandleState {
            state: HandleStatus::Closed
        })
    ));
    assert_eq!(seen.lock().unwrap().len(), 1, "closed handle must not reach backend");
}

#[test]
fn test_unparseable_image_is_decode_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"\xFF\xD8 truncated").unwrap();

    let (backend, seen) = RecordingBackend::new([1, 4, 4, 3], DataType::Float32);
    let handle = ModelHandle::from_backend(backend, 1);

    let result = handle.run(path.to_str().unwrap(), &RunOptions::default());
    assert!(matches!(result, Err(InferenceError::ImageDecode { .. })));
    assert!(seen.lock().unwrap().is_empty());
}
