use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifacts::ArtifactError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelManifestSchemaVersion {
    V1,
}

/// Numeric precision of a persisted weight record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelPrecision {
    #[default]
    Full,
    /// Reduced-precision record written by the converter.
    Half,
}

/// Smallest input side the network accepts: three valid 3x3 convolutions,
/// each followed by a 2x2 pool.
pub const MIN_INPUT_SIZE: u32 = 22;

/// Sidecar describing how to rebuild the network a weight record belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelManifest {
    pub schema_version: ModelManifestSchemaVersion,
    /// Square input side in pixels.
    pub input_size: u32,
    pub hidden: usize,
    pub precision: ModelPrecision,
    /// Dataset folder name mapped to probability 1.0.
    pub positive_class: String,
    pub created_at_unix: f64,
}

impl ModelManifest {
    pub fn new(input_size: u32, hidden: usize, precision: ModelPrecision) -> Self {
        Self {
            schema_version: ModelManifestSchemaVersion::V1,
            input_size,
            hidden,
            precision,
            positive_class: "abnormal".to_string(),
            created_at_unix: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.input_size < MIN_INPUT_SIZE {
            return Err(format!(
                "input_size {} is too small for the network (min {MIN_INPUT_SIZE})",
                self.input_size
            ));
        }
        if self.hidden == 0 {
            return Err("hidden cannot be zero".into());
        }
        if self.positive_class.trim().is_empty() {
            return Err("positive_class cannot be empty".into());
        }
        if self.created_at_unix.is_nan() || self.created_at_unix < 0.0 {
            return Err("created_at_unix must be non-negative".into());
        }
        Ok(())
    }

    /// Sidecar location for a weight record: `final_model.bin` -> `final_model.json`.
    pub fn sidecar_path(artifact: &Path) -> PathBuf {
        artifact.with_extension("json")
    }

    pub fn write_for(&self, artifact: &Path) -> Result<PathBuf, ArtifactError> {
        let path = Self::sidecar_path(artifact);
        let json = serde_json::to_vec_pretty(self).map_err(|source| ArtifactError::Manifest {
            path: path.clone(),
            msg: source.to_string(),
        })?;
        fs::write(&path, json).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Reads the sidecar next to `artifact`; `Ok(None)` when there is none.
    pub fn read_for(artifact: &Path) -> Result<Option<Self>, ArtifactError> {
        let path = Self::sidecar_path(artifact);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        let manifest: ModelManifest =
            serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Manifest {
                path: path.clone(),
                msg: e.to_string(),
            })?;
        manifest
            .validate()
            .map_err(|msg| ArtifactError::Manifest { path, msg })?;
        Ok(Some(manifest))
    }
}
