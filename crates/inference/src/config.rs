use crate::output::OutputPolicy;
use anyhow::Context;
use preprocess::{Interpolation, Normalization, PreprocessOptions};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

pub use common::Environment;

pub const DEFAULT_NUM_THREADS: usize = 1;

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub environment: Environment,
    pub num_threads: usize,
    pub image_mean: f32,
    pub image_std: f32,
    pub maintain_aspect_ratio: bool,
    pub interpolation: Interpolation,
    pub output_policy: OutputPolicy,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Unset variables take their default; set but unparsable ones are errors.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            environment: Environment::from_env(),
            num_threads: env_or("NUM_THREADS", DEFAULT_NUM_THREADS)?,
            image_mean: env_or("IMAGE_MEAN", Normalization::DEFAULT_MEAN)?,
            image_std: env_or("IMAGE_STD", Normalization::DEFAULT_STD)?,
            maintain_aspect_ratio: env_or("MAINTAIN_ASPECT_RATIO", false)?,
            interpolation: env_or("INTERPOLATION", Interpolation::default())?,
            output_policy: env_or("OUTPUT_POLICY", OutputPolicy::default())?,
        };

        if config.num_threads == 0 {
            anyhow::bail!("NUM_THREADS must be at least 1");
        }

        Ok(config)
    }

    /// Options for one inference call at the given rotation.
    pub fn run_options(&self, rotation_degrees: i32) -> RunOptions {
        RunOptions {
            rotation_degrees,
            normalization: Normalization::uniform(self.image_mean, self.image_std),
            maintain_aspect_ratio: self.maintain_aspect_ratio,
            interpolation: self.interpolation,
            output_policy: self.output_policy,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            num_threads: DEFAULT_NUM_THREADS,
            image_mean: Normalization::DEFAULT_MEAN,
            image_std: Normalization::DEFAULT_STD,
            maintain_aspect_ratio: false,
            interpolation: Interpolation::default(),
            output_policy: OutputPolicy::default(),
        }
    }
}

/// Per-call knobs for [`crate::ModelHandle::run`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunOptions {
    pub rotation_degrees: i32,
    pub normalization: Normalization,
    pub maintain_aspect_ratio: bool,
    pub interpolation: Interpolation,
    pub output_policy: OutputPolicy,
}

impl RunOptions {
    pub fn new(rotation_degrees: i32, mean: f32, std: f32) -> Self {
        Self {
            rotation_degrees,
            normalization: Normalization::uniform(mean, std),
            ..Default::default()
        }
    }

    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions {
            rotation_degrees: self.rotation_degrees,
            maintain_aspect_ratio: self.maintain_aspect_ratio,
            interpolation: self.interpolation,
            normalization: self.normalization,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Invalid value for {key}: '{raw}'")),
        Err(_) => Ok(default),
    }
}
