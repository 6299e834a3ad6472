//! Model handle lifecycle: `Unloaded -> Loaded -> Closed`.
//!
//! A single mutex guards the backend, so load, run and close on one handle
//! never overlap. Inference is only possible while `Loaded`; any other state
//! fails with [`InferenceError::HandleState`] before the backend is touched.

use crate::backend::{InferenceBackend, TensorInfo};
use crate::config::RunOptions;
use crate::error::InferenceError;
use crate::metrics::InferenceMetrics;
use crate::output::{OutputPolicy, OutputTensor, OutputTensorSet};
use common::span;
use preprocess::{CpuPreProcessor, Image, InputTensorSpec, PackedInput};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    Unloaded,
    Loaded,
    Closed,
}

impl fmt::Display for HandleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandleStatus::Unloaded => "unloaded",
            HandleStatus::Loaded => "loaded",
            HandleStatus::Closed => "closed",
        })
    }
}

enum HandleState<B> {
    Unloaded,
    Loaded(LoadedModel<B>),
    Closed,
}

impl<B> HandleState<B> {
    fn status(&self) -> HandleStatus {
        match self {
            HandleState::Unloaded => HandleStatus::Unloaded,
            HandleState::Loaded(_) => HandleStatus::Loaded,
            HandleState::Closed => HandleStatus::Closed,
        }
    }
}

struct LoadedModel<B> {
    backend: B,
    num_threads: usize,
}

impl<B: InferenceBackend> LoadedModel<B> {
    /// Read fresh on every call; the backend owns the declaration.
    fn input_spec(&self) -> Result<InputTensorSpec, InferenceError> {
        let info = self.backend.input_info()?;
        Ok(InputTensorSpec::from_declared(&info.dims, &info.data_type)?)
    }

    fn invoke(
        &mut self,
        input: &PackedInput,
        policy: OutputPolicy,
    ) -> Result<OutputTensorSet, InferenceError> {
        let declared = self.backend.output_infos()?;
        let raw = self.backend.infer(input)?;

        if raw.len() != declared.len() {
            return Err(InferenceError::ShapeMismatch {
                tensor: "outputs".to_string(),
                expected: vec![declared.len() as i64],
                actual: vec![raw.len() as i64],
            });
        }

        raw.into_iter()
            .zip(&declared)
            .enumerate()
            .map(|(index, (raw, info))| {
                OutputTensor::from_raw(index, raw, info, policy).map(|t| (index, t))
            })
            .collect()
    }
}

pub struct ModelHandle<B: InferenceBackend> {
    state: Mutex<HandleState<B>>,
    metrics: InferenceMetrics,
}

impl<B: InferenceBackend> ModelHandle<B> {
    /// A handle with no model behind it.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HandleState::Unloaded),
            metrics: InferenceMetrics::default(),
        }
    }

    /// Load compiled model bytes into a fresh handle.
    pub fn load(model: &[u8], num_threads: usize) -> Result<Self, InferenceError> {
        let handle = Self::new();
        handle.load_model(model, num_threads)?;
        Ok(handle)
    }

    /// Read a model file and load it.
    pub fn load_file(path: impl AsRef<Path>, num_threads: usize) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let model = std::fs::read(path).map_err(|e| {
            InferenceError::model_load(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::load(&model, num_threads)
    }

    /// Wrap an already constructed backend.
    pub fn from_backend(backend: B, num_threads: usize) -> Self {
        Self {
            state: Mutex::new(HandleState::Loaded(LoadedModel {
                backend,
                num_threads,
            })),
            metrics: InferenceMetrics::default(),
        }
    }

    /// Load a model into this handle, replacing any previous one.
    ///
    /// Also reopens a closed handle.
    pub fn load_model(&self, model: &[u8], num_threads: usize) -> Result<(), InferenceError> {
        let _s = span!("load_model");

        if num_threads == 0 {
            return Err(InferenceError::InvalidThreadCount(num_threads));
        }

        let mut state = self.lock()?;

        let backend = B::load_model(model, num_threads).inspect_err(|e| {
            tracing::error!(error = %e, "Model load failed");
        })?;

        if let HandleState::Loaded(previous) = &*state {
            tracing::warn!(
                previous_threads = previous.num_threads,
                "Replacing previously loaded model"
            );
        }

        *state = HandleState::Loaded(LoadedModel {
            backend,
            num_threads,
        });

        tracing::info!(model_bytes = model.len(), num_threads, "Model loaded");
        Ok(())
    }

    /// Release the backend. Idempotent; a poisoned lock is still closed.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match std::mem::replace(&mut *state, HandleState::Closed) {
            HandleState::Loaded(model) => {
                drop(model);
                tracing::info!("Model handle closed");
            }
            HandleState::Unloaded => tracing::debug!("Closed a handle that was never loaded"),
            HandleState::Closed => tracing::debug!("Handle already closed"),
        }
    }

    pub fn status(&self) -> HandleStatus {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status()
    }

    pub fn num_threads(&self) -> Result<usize, InferenceError> {
        self.with_loaded(|model| Ok(model.num_threads))
    }

    pub fn input_spec(&self) -> Result<InputTensorSpec, InferenceError> {
        self.with_loaded(|model| model.input_spec())
    }

    pub fn output_infos(&self) -> Result<Vec<TensorInfo>, InferenceError> {
        self.with_loaded(|model| model.backend.output_infos())
    }

    /// Decode `image_path`, preprocess it for the model input and run it.
    pub fn run_inference(
        &self,
        image_path: &str,
        rotation_degrees: i32,
        mean: f32,
        std: f32,
    ) -> Result<OutputTensorSet, InferenceError> {
        self.run(image_path, &RunOptions::new(rotation_degrees, mean, std))
    }

    pub fn run(
        &self,
        image_path: &str,
        options: &RunOptions,
    ) -> Result<OutputTensorSet, InferenceError> {
        self.instrumented(|model| {
            let spec = model.input_spec()?;
            let packed = CpuPreProcessor::new(options.preprocess_options())
                .preprocess_path(image_path, &spec)?;
            model.invoke(&packed, options.output_policy)
        })
    }

    /// Same as [`Self::run`] for an already decoded image.
    pub fn run_image(
        &self,
        image: &Image,
        options: &RunOptions,
    ) -> Result<OutputTensorSet, InferenceError> {
        self.instrumented(|model| {
            let spec = model.input_spec()?;
            let packed =
                CpuPreProcessor::new(options.preprocess_options()).preprocess(image, &spec)?;
            model.invoke(&packed, options.output_policy)
        })
    }

    fn instrumented<F>(&self, f: F) -> Result<OutputTensorSet, InferenceError>
    where
        F: FnOnce(&mut LoadedModel<B>) -> Result<OutputTensorSet, InferenceError>,
    {
        let _s = span!("run_inference");
        let start = Instant::now();

        let result = self.with_loaded(f);

        match &result {
            Ok(outputs) => {
                let elapsed = start.elapsed();
                self.metrics.record_success(elapsed);
                tracing::debug!(
                    outputs = outputs.len(),
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Inference complete"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
                tracing::warn!(error = %e, kind = e.kind(), "Inference failed");
            }
        }

        result
    }

    fn with_loaded<T>(
        &self,
        f: impl FnOnce(&mut LoadedModel<B>) -> Result<T, InferenceError>,
    ) -> Result<T, InferenceError> {
        let mut state = self.lock()?;
        match &mut *state {
            HandleState::Loaded(model) => f(model),
            other => Err(InferenceError::HandleState {
                state: other.status(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HandleState<B>>, InferenceError> {
        self.state.lock().map_err(|_| InferenceError::Poisoned)
    }
}

impl<B: InferenceBackend> Default for ModelHandle<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: InferenceBackend> fmt::Debug for ModelHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("status", &self.status())
            .finish()
    }
}
