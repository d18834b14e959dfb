use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FINAL_MODEL_PATH: &str = "saved_model/final_model.bin";
pub const BEST_MODEL_PATH: &str = "best_model.bin";
pub const QUANTIZED_MODEL_PATH: &str = "saved_model/model_quant.bin";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("model artifact missing: {path}")]
    Missing { path: PathBuf },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid model manifest at {path}: {msg}")]
    Manifest { path: PathBuf, msg: String },
}

/// Locations of the persisted model artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub final_model: PathBuf,
    pub best_model: PathBuf,
    pub quantized_model: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            final_model: PathBuf::from(FINAL_MODEL_PATH),
            best_model: PathBuf::from(BEST_MODEL_PATH),
            quantized_model: PathBuf::from(QUANTIZED_MODEL_PATH),
        }
    }
}

impl ArtifactPaths {
    /// Same layout re-rooted under `root` (used by tests and alternate workdirs).
    pub fn under(root: &Path) -> Self {
        let defaults = Self::default();
        Self {
            final_model: root.join(defaults.final_model),
            best_model: root.join(defaults.best_model),
            quantized_model: root.join(defaults.quantized_model),
        }
    }

    /// Fails with [`ArtifactError::Missing`] unless `path` exists.
    pub fn require(path: &Path) -> Result<&Path, ArtifactError> {
        if path.exists() {
            Ok(path)
        } else {
            Err(ArtifactError::Missing {
                path: path.to_path_buf(),
            })
        }
    }
}
