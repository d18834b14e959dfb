use burn::backend::Autodiff;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use clap::{Parser, ValueEnum};
use data_contracts::artifacts::{BEST_MODEL_PATH, FINAL_MODEL_PATH};
use data_contracts::{ModelManifest, ModelPrecision, MIN_INPUT_SIZE};
use models::checkpoint::{self, RecordPrecision};
use rand::seq::SliceRandom;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use vision_core::interfaces::DECISION_THRESHOLD;
use vision_core::segment::{BackgroundReference, DEFAULT_TOLERANCE};

use crate::aug::AugmentConfig;
use crate::dataset::{BatchLoader, ClassFolderDataset, DatasetConfig, DatasetError, LabeledImage};
use crate::{PostureNet, PostureNetConfig, TrainBackend};

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "train", about = "Train the PostureNet posture classifier")]
pub struct TrainArgs {
    /// Dataset root containing exactly two class folders.
    #[arg(long, default_value = "dataset")]
    pub dataset_root: PathBuf,
    /// Class folder treated as abnormal posture (label 1).
    #[arg(long, default_value = "abnormal")]
    pub positive_class: String,
    /// Square model input side in pixels.
    #[arg(long, default_value_t = 64)]
    pub input_size: u32,
    /// Width of the dense layer.
    #[arg(long, default_value_t = 256)]
    pub hidden: usize,
    /// Number of epochs.
    #[arg(long, default_value_t = 15)]
    pub epochs: usize,
    /// Batch size.
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,
    /// Learning rate.
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,
    /// Fraction of each class held out for validation.
    #[arg(long, default_value_t = 0.2)]
    pub validation_split: f32,
    /// Disable training-time augmentation.
    #[arg(long, default_value_t = false)]
    pub no_augment: bool,
    /// Seed for shuffling and augmentation.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
    /// Final model output path.
    #[arg(long, default_value = FINAL_MODEL_PATH)]
    pub checkpoint_out: PathBuf,
    /// Best-validation-loss model output path.
    #[arg(long, default_value = BEST_MODEL_PATH)]
    pub best_checkpoint_out: PathBuf,
    /// Photo of the empty scene; background pixels are blanked in every sample.
    #[arg(long)]
    pub background: Option<PathBuf>,
    /// Per-channel difference from the background that counts as subject.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub background_tolerance: u8,
}

impl TrainArgs {
    /// Rejects hyperparameters the network cannot be built with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.input_size < MIN_INPUT_SIZE {
            anyhow::bail!(
                "--input-size {} is below the network minimum of {MIN_INPUT_SIZE}",
                self.input_size
            );
        }
        if self.hidden == 0 {
            anyhow::bail!("--hidden must be at least 1");
        }
        if self.batch_size == 0 {
            anyhow::bail!("--batch-size must be at least 1");
        }
        Ok(())
    }

    pub fn net_config(&self) -> PostureNetConfig {
        PostureNetConfig {
            input_size: self.input_size as usize,
            hidden: self.hidden,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f32,
    pub validation: Option<EvalMetrics>,
}

impl EpochStats {
    /// Loss used for best-checkpoint selection.
    pub fn monitored_loss(&self) -> f32 {
        self.validation
            .map(|v| v.loss)
            .unwrap_or(self.train_loss)
    }
}

#[derive(Debug, Clone)]
pub struct TrainReport {
    pub epochs: Vec<EpochStats>,
    pub best_epoch: Option<usize>,
    pub final_checkpoint: PathBuf,
    pub best_checkpoint: PathBuf,
}

/// Binary classification counts at a fixed threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalMetrics {
    pub samples: usize,
    pub loss: f32,
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tn: usize,
}

impl EvalMetrics {
    pub fn record(&mut self, probability: f32, label: f32) {
        let predicted = probability > DECISION_THRESHOLD;
        let actual = label > 0.5;
        match (predicted, actual) {
            (true, true) => self.tp += 1,
            (true, false) => self.fp += 1,
            (false, true) => self.fn_ += 1,
            (false, false) => self.tn += 1,
        }
        self.samples += 1;
    }

    pub fn accuracy(&self) -> f32 {
        ratio(self.tp + self.tn, self.samples)
    }

    pub fn precision(&self) -> f32 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f32 {
        ratio(self.tp, self.tp + self.fn_)
    }
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

/// Mean binary cross-entropy over `[batch, 1]` probabilities.
pub fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let eps = 1e-6;
    let probs = probs.clamp(eps, 1.0 - eps);
    let ones = Tensor::<B, 2>::ones(probs.dims(), &probs.device());
    let targets_inv = ones.clone() - targets.clone();
    -((targets * probs.clone().log()) + (targets_inv * (ones - probs).log())).mean()
}

fn read_f32(data: TensorData) -> Result<Vec<f32>, DatasetError> {
    data.to_vec::<f32>()
        .map_err(|e| DatasetError::TensorData(format!("{e:?}")))
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> Result<f32, DatasetError> {
    read_f32(t.into_data())?
        .first()
        .copied()
        .ok_or_else(|| DatasetError::TensorData("empty loss tensor".into()))
}

/// Loss and confusion counts of `model` over `samples` (no augmentation).
pub fn evaluate<B: Backend>(
    model: &PostureNet<B>,
    samples: &[LabeledImage],
    loader: &mut BatchLoader,
    batch_size: usize,
    device: &B::Device,
) -> Result<EvalMetrics, DatasetError> {
    let mut metrics = EvalMetrics::default();
    let mut loss_sum = 0.0f32;
    for chunk in samples.chunks(batch_size.max(1)) {
        let batch = loader.load::<B>(chunk, false, device)?;
        let probs = model.forward(batch.images);
        loss_sum += scalar(binary_cross_entropy(probs.clone(), batch.labels.clone()))?
            * chunk.len() as f32;
        let probs = read_f32(probs.into_data())?;
        if probs.len() != chunk.len() {
            return Err(DatasetError::TensorData(format!(
                "{} predictions for {} samples",
                probs.len(),
                chunk.len()
            )));
        }
        for (p, sample) in probs.into_iter().zip(chunk) {
            metrics.record(p, sample.label);
        }
    }
    if metrics.samples > 0 {
        metrics.loss = loss_sum / metrics.samples as f32;
    }
    Ok(metrics)
}

type ADBackend = Autodiff<TrainBackend>;

pub fn run_train(args: TrainArgs) -> anyhow::Result<TrainReport> {
    args.validate()?;
    validate_backend_choice(args.backend)?;

    let dataset = ClassFolderDataset::load(&DatasetConfig {
        root: args.dataset_root.clone(),
        positive_class: args.positive_class.clone(),
        validation_split: args.validation_split,
    })?;
    if dataset.train.is_empty() {
        anyhow::bail!(
            "dataset {} has no training samples after the validation split",
            args.dataset_root.display()
        );
    }
    for path in [&args.checkpoint_out, &args.best_checkpoint_out] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut loader = BatchLoader::new(args.input_size, args.seed);
    if !args.no_augment {
        let augment = AugmentConfig::default();
        tracing::info!(augment = %augment.describe(), "training augmentation");
        loader = loader.with_augment(augment);
    }
    if let Some(path) = &args.background {
        let segmenter = BackgroundReference::open(path, args.background_tolerance)?;
        tracing::info!(background = %path.display(), "background masking enabled");
        loader = loader.with_segmenter(Box::new(segmenter));
    }

    let device = <ADBackend as Backend>::Device::default();
    let mut model = PostureNet::<ADBackend>::new(args.net_config(), &device);
    let mut optim = AdamConfig::new().init();

    let batch_size = args.batch_size.max(1);
    let mut train = dataset.train.clone();
    let mut report = TrainReport {
        epochs: Vec::with_capacity(args.epochs),
        best_epoch: None,
        final_checkpoint: args.checkpoint_out.clone(),
        best_checkpoint: args.best_checkpoint_out.clone(),
    };
    let mut best_loss = f32::INFINITY;

    for epoch in 0..args.epochs {
        train.shuffle(loader.rng());
        let mut losses = Vec::new();
        for chunk in train.chunks(batch_size) {
            let batch = loader.load::<ADBackend>(chunk, true, &device)?;
            let probs = model.forward(batch.images);
            let loss = binary_cross_entropy(probs, batch.labels);
            let loss_detached = loss.clone().detach();
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(args.lr, model, grads);
            losses.push(scalar(loss_detached)?);
        }
        let train_loss: f32 = if losses.is_empty() {
            0.0
        } else {
            losses.iter().sum::<f32>() / losses.len() as f32
        };

        let valid_model = model.valid();
        let validation = if dataset.validation.is_empty() {
            None
        } else {
            Some(evaluate(
                &valid_model,
                &dataset.validation,
                &mut loader,
                batch_size,
                &device,
            )?)
        };
        let stats = EpochStats {
            epoch,
            train_loss,
            validation,
        };
        match validation {
            Some(v) => tracing::info!(
                epoch,
                train_loss,
                val_loss = v.loss,
                val_accuracy = v.accuracy(),
                "epoch complete"
            ),
            None => tracing::info!(epoch, train_loss, "epoch complete"),
        }

        if stats.monitored_loss() < best_loss {
            best_loss = stats.monitored_loss();
            save_with_manifest(&valid_model, &args, &args.best_checkpoint_out)?;
            report.best_epoch = Some(epoch);
            tracing::info!(
                epoch,
                loss = best_loss,
                path = %args.best_checkpoint_out.display(),
                "saved best checkpoint"
            );
        }
        report.epochs.push(stats);
    }

    save_with_manifest(&model.valid(), &args, &args.checkpoint_out)?;
    tracing::info!(path = %args.checkpoint_out.display(), "saved final model");
    Ok(report)
}

fn save_with_manifest(
    model: &PostureNet<TrainBackend>,
    args: &TrainArgs,
    path: &Path,
) -> anyhow::Result<()> {
    checkpoint::save(model, path, RecordPrecision::Full)
        .map_err(|e| anyhow::anyhow!("failed to save checkpoint {}: {e}", path.display()))?;
    let mut manifest = ModelManifest::new(args.input_size, args.hidden, ModelPrecision::Full);
    manifest.positive_class = args.positive_class.clone();
    manifest.created_at_unix = unix_now();
    manifest.write_for(path)?;
    Ok(())
}

pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

pub fn validate_backend_choice(kind: BackendKind) -> anyhow::Result<()> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (kind, built_wgpu) {
        (BackendKind::Wgpu, false) => {
            anyhow::bail!("backend-wgpu feature not enabled; rebuild with --features backend-wgpu or choose ndarray backend")
        }
        (BackendKind::NdArray, true) => {
            tracing::warn!("built with backend-wgpu; training will still use the WGPU backend despite --backend ndarray");
        }
        _ => {}
    }
    Ok(())
}
