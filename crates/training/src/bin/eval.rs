use anyhow::Context;
use clap::{Parser, ValueEnum};
use data_contracts::artifacts::FINAL_MODEL_PATH;
use data_contracts::{ArtifactPaths, ModelManifest};
use models::checkpoint;
use std::path::PathBuf;
use training::dataset::{BatchLoader, ClassFolderDataset, DatasetConfig};
use training::export::record_precision;
use training::util::{evaluate, validate_backend_choice, BackendKind};
use training::{PostureNetConfig, TrainBackend};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Subset {
    Validation,
    All,
}

#[derive(Parser, Debug)]
#[command(
    name = "eval",
    about = "Evaluate a PostureNet checkpoint on a class-folder dataset (accuracy/precision/recall)"
)]
struct Args {
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    backend: BackendKind,
    /// Dataset root containing exactly two class folders.
    #[arg(long, default_value = "dataset")]
    dataset_root: PathBuf,
    /// Class folder treated as abnormal posture.
    #[arg(long, default_value = "abnormal")]
    positive_class: String,
    /// Fraction of each class held out for validation.
    #[arg(long, default_value_t = 0.2)]
    validation_split: f32,
    /// Which samples to score.
    #[arg(long, value_enum, default_value_t = Subset::Validation)]
    subset: Subset,
    /// Checkpoint path to load.
    #[arg(long, default_value = FINAL_MODEL_PATH)]
    checkpoint: PathBuf,
    /// Batch size.
    #[arg(long, default_value_t = 32)]
    batch_size: usize,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    validate_backend_choice(args.backend)?;

    ArtifactPaths::require(&args.checkpoint)?;
    let manifest = ModelManifest::read_for(&args.checkpoint)?
        .with_context(|| format!("{} has no manifest sidecar", args.checkpoint.display()))?;
    let cfg = PostureNetConfig {
        input_size: manifest.input_size as usize,
        hidden: manifest.hidden,
        ..Default::default()
    };

    let dataset = ClassFolderDataset::load(&DatasetConfig {
        root: args.dataset_root.clone(),
        positive_class: args.positive_class.clone(),
        validation_split: args.validation_split,
    })?;
    let samples = match args.subset {
        Subset::Validation => dataset.validation.clone(),
        Subset::All => {
            let mut all = dataset.train.clone();
            all.extend(dataset.validation.iter().cloned());
            all
        }
    };
    if samples.is_empty() {
        println!("No samples selected under {}", args.dataset_root.display());
        return Ok(());
    }

    let device = <TrainBackend as burn::tensor::backend::Backend>::Device::default();
    let model = checkpoint::load::<TrainBackend>(
        cfg,
        &args.checkpoint,
        record_precision(manifest.precision),
        &device,
    )
    .map_err(|e| anyhow::anyhow!("failed to load checkpoint {}: {e}", args.checkpoint.display()))?;

    let mut loader = BatchLoader::new(manifest.input_size, 0);
    let metrics = evaluate(&model, &samples, &mut loader, args.batch_size, &device)?;

    println!(
        "Eval complete: loss={:.4}, accuracy={:.3}, precision={:.3}, recall={:.3} (tp={}, fp={}, fn={}, tn={})",
        metrics.loss,
        metrics.accuracy(),
        metrics.precision(),
        metrics.recall(),
        metrics.tp,
        metrics.fp,
        metrics.fn_,
        metrics.tn
    );
    Ok(())
}
