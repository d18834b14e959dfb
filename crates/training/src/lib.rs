#![recursion_limit = "256"]

pub mod aug;
pub mod dataset;
pub mod export;
pub mod util;

pub use aug::AugmentConfig;
pub use dataset::{BatchLoader, ClassFolderDataset, DatasetConfig, DatasetError, LabeledImage};
pub use export::{BurnRecordConverter, ConversionReport, ExportError, ModelConverter, Optimization};
pub use models::{PostureNet, PostureNetConfig};
pub use util::{evaluate, run_train, EvalMetrics, TrainArgs, TrainReport};
/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
