//! Conversion of trained weight records into the compact on-device artifact.

use clap::ValueEnum;
use data_contracts::{ArtifactError, ArtifactPaths, ModelManifest, ModelPrecision};
use models::checkpoint::{self, RecordPrecision};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::{PostureNetConfig, TrainBackend};

/// Size/latency optimizations applied during conversion.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optimization {
    /// Re-record weights at half precision.
    Default,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("failed to read or write weight record {path}: {msg}")]
    Record { path: PathBuf, msg: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub precision: ModelPrecision,
    pub source_bytes: u64,
    pub output_bytes: u64,
}

pub trait ModelConverter {
    fn convert(
        &self,
        source: &Path,
        output: &Path,
        optimizations: &[Optimization],
    ) -> Result<ConversionReport, ExportError>;
}

/// Converts Burn binary records; the architecture comes from the source's
/// manifest sidecar, or `fallback` when there is none.
#[derive(Debug, Clone, Default)]
pub struct BurnRecordConverter {
    pub fallback: PostureNetConfig,
}

impl BurnRecordConverter {
    pub fn new(fallback: PostureNetConfig) -> Self {
        Self { fallback }
    }
}

impl ModelConverter for BurnRecordConverter {
    fn convert(
        &self,
        source: &Path,
        output: &Path,
        optimizations: &[Optimization],
    ) -> Result<ConversionReport, ExportError> {
        ArtifactPaths::require(source)?;
        let mut manifest = ModelManifest::read_for(source)?.unwrap_or_else(|| {
            tracing::warn!(
                path = %source.display(),
                "no manifest sidecar; assuming default architecture"
            );
            ModelManifest::new(
                self.fallback.input_size as u32,
                self.fallback.hidden,
                ModelPrecision::Full,
            )
        });
        let cfg = PostureNetConfig {
            input_size: manifest.input_size as usize,
            hidden: manifest.hidden,
            ..self.fallback.clone()
        };

        let device = <TrainBackend as burn::tensor::backend::Backend>::Device::default();
        let model = checkpoint::load::<TrainBackend>(
            cfg,
            source,
            record_precision(manifest.precision),
            &device,
        )
        .map_err(|e| ExportError::Record {
            path: source.to_path_buf(),
            msg: e.to_string(),
        })?;

        let precision = if optimizations.contains(&Optimization::Default) {
            ModelPrecision::Half
        } else {
            ModelPrecision::Full
        };
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|source| ExportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        checkpoint::save(&model, output, record_precision(precision)).map_err(|e| {
            ExportError::Record {
                path: output.to_path_buf(),
                msg: e.to_string(),
            }
        })?;
        manifest.precision = precision;
        manifest.created_at_unix = crate::util::unix_now();
        manifest.write_for(output)?;

        let report = ConversionReport {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            precision,
            source_bytes: file_len(source)?,
            output_bytes: file_len(output)?,
        };
        tracing::info!(
            source = %report.source.display(),
            output = %report.output.display(),
            ?precision,
            source_bytes = report.source_bytes,
            output_bytes = report.output_bytes,
            "converted model"
        );
        Ok(report)
    }
}

pub fn record_precision(precision: ModelPrecision) -> RecordPrecision {
    match precision {
        ModelPrecision::Full => RecordPrecision::Full,
        ModelPrecision::Half => RecordPrecision::Half,
    }
}

fn file_len(path: &Path) -> Result<u64, ExportError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
}
