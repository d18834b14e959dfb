use burn::tensor::{Tensor, TensorData};
use data_contracts::{ArtifactPaths, ModelManifest, ModelPrecision};
use models::checkpoint::{self, RecordPrecision};
use models::{PostureNet, PostureNetConfig};
use std::path::{Path, PathBuf};
use vision_core::interfaces::{Classifier, ClassifierError, Frame};
use vision_core::preprocess::frame_to_input;

use crate::interpreter::QuantizedInterpreter;
use crate::{InferenceBackend, InferenceError};

type Device = <InferenceBackend as burn::tensor::backend::Backend>::Device;

/// Which artifact to load and, optionally, which precision to read it as.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSpec {
    pub path: PathBuf,
    /// Overrides the manifest's precision when set.
    pub precision: Option<ModelPrecision>,
}

impl ArtifactSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            precision: None,
        }
    }

    pub fn with_precision(mut self, precision: ModelPrecision) -> Self {
        self.precision = Some(precision);
        self
    }
}

/// Loads a `PostureNet` record and the manifest describing it.
///
/// Without a manifest sidecar the default architecture is assumed, read at
/// `default_precision`.
pub(crate) fn load_posture_net(
    path: &Path,
    precision: Option<ModelPrecision>,
    default_precision: ModelPrecision,
    device: &Device,
) -> Result<(PostureNet<InferenceBackend>, ModelManifest), InferenceError> {
    ArtifactPaths::require(path)?;
    let mut manifest = match ModelManifest::read_for(path)? {
        Some(manifest) => manifest,
        None => {
            let defaults = PostureNetConfig::default();
            tracing::warn!(
                path = %path.display(),
                "no manifest sidecar; assuming default architecture"
            );
            ModelManifest::new(
                defaults.input_size as u32,
                defaults.hidden,
                default_precision,
            )
        }
    };
    if let Some(precision) = precision {
        manifest.precision = precision;
    }
    let cfg = PostureNetConfig {
        input_size: manifest.input_size as usize,
        hidden: manifest.hidden,
        ..Default::default()
    };
    let record_precision = match manifest.precision {
        ModelPrecision::Full => RecordPrecision::Full,
        ModelPrecision::Half => RecordPrecision::Half,
    };
    let model = checkpoint::load::<InferenceBackend>(cfg, path, record_precision, device)
        .map_err(|e| InferenceError::Record {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;
    Ok((model, manifest))
}

/// Full-precision classifier running `PostureNet` directly.
pub struct BurnPostureClassifier {
    model: PostureNet<InferenceBackend>,
    input_size: u32,
    device: Device,
}

impl BurnPostureClassifier {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let device = Device::default();
        let (model, manifest) = load_posture_net(path, None, ModelPrecision::Full, &device)?;
        Ok(Self {
            model,
            input_size: manifest.input_size,
            device,
        })
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl Classifier for BurnPostureClassifier {
    fn predict(&mut self, frame: &Frame) -> Result<f32, ClassifierError> {
        let side = self.input_size as usize;
        let input = frame_to_input(frame, self.input_size)?;
        let tensor = Tensor::<InferenceBackend, 4>::from_data(
            TensorData::new(input, [1, 3, side, side]),
            &self.device,
        );
        let probs = self
            .model
            .forward(tensor)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("{e:?}")))?;
        probs
            .first()
            .copied()
            .ok_or_else(|| ClassifierError::Inference("model produced no output".into()))
    }
}

/// Builds the classifier matching an artifact's precision.
pub struct ClassifierFactory;

impl ClassifierFactory {
    /// Full-precision artifacts run through [`BurnPostureClassifier`]; half
    /// precision ones through [`QuantizedInterpreter`]. A missing artifact is
    /// an error, never a fallback.
    pub fn build(&self, spec: &ArtifactSpec) -> Result<Box<dyn Classifier>, InferenceError> {
        ArtifactPaths::require(&spec.path)?;
        let precision = match spec.precision {
            Some(precision) => precision,
            None => ModelManifest::read_for(&spec.path)?
                .map(|m| m.precision)
                .unwrap_or_default(),
        };
        let classifier: Box<dyn Classifier> = match precision {
            ModelPrecision::Full => {
                let device = Device::default();
                let (model, manifest) =
                    load_posture_net(&spec.path, Some(precision), precision, &device)?;
                Box::new(BurnPostureClassifier {
                    model,
                    input_size: manifest.input_size,
                    device,
                })
            }
            ModelPrecision::Half => {
                let mut interpreter =
                    QuantizedInterpreter::load_as(&spec.path, Some(precision))?;
                interpreter.allocate_tensors();
                Box::new(interpreter)
            }
        };
        tracing::info!(path = %spec.path.display(), ?precision, "loaded classifier");
        Ok(classifier)
    }
}
