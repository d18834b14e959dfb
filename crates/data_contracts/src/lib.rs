//! Shared data contracts for model artifacts, manifests, and sample records.

pub mod artifacts;
pub mod manifest;
pub mod record;

pub use artifacts::{ArtifactError, ArtifactPaths};
pub use manifest::{ModelManifest, ModelManifestSchemaVersion, ModelPrecision, MIN_INPUT_SIZE};
pub use record::{SampleRecord, ValidationError};
