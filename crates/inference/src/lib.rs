#![recursion_limit = "256"]

pub mod factory;
pub mod interpreter;

use data_contracts::ArtifactError;
use std::path::PathBuf;
use thiserror::Error;

#[cfg(feature = "backend-wgpu")]
pub type InferenceBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type InferenceBackend = burn_ndarray::NdArray<f32>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("failed to load weight record {path}: {msg}")]
    Record { path: PathBuf, msg: String },
    #[error("{kind} tensor index {index} out of range ({count} available)")]
    TensorIndex {
        kind: &'static str,
        index: usize,
        count: usize,
    },
    #[error("input has {actual} values, expected {expected}")]
    InputLength { expected: usize, actual: usize },
    #[error("tensors not allocated; call allocate_tensors first")]
    NotAllocated,
    #[error("no output available; call invoke first")]
    NotInvoked,
    #[error("failed to read model output: {0}")]
    Output(String),
}

pub use factory::{ArtifactSpec, BurnPostureClassifier, ClassifierFactory};
pub use interpreter::QuantizedInterpreter;

pub mod prelude {
    pub use crate::factory::{ArtifactSpec, BurnPostureClassifier, ClassifierFactory};
    pub use crate::interpreter::QuantizedInterpreter;
    pub use crate::{InferenceBackend, InferenceError};
}
