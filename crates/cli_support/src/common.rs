use clap::{Args, ValueEnum};
use data_contracts::ModelPrecision;
use monitor::DebounceRule;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;

/// Camera selection options shared by `monitor` and `list_cameras`.
#[derive(Debug, Clone, Default, Args)]
pub struct CameraArgs {
    /// Camera indices to try, in order (e.g. `--camera 1,0,2,3`).
    #[arg(long = "camera", value_delimiter = ',')]
    pub cameras: Vec<i32>,
    /// Requested capture width; the device may ignore it.
    #[arg(long)]
    pub width: Option<u32>,
    /// Requested capture height; the device may ignore it.
    #[arg(long)]
    pub height: Option<u32>,
    /// With two or more usable cameras, take the last one.
    #[arg(long, default_value_t = false)]
    pub prefer_external: bool,
    /// Replay a directory of images as camera 0 instead of real hardware.
    #[arg(long)]
    pub replay_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrecisionArg {
    Full,
    Half,
}

impl From<PrecisionArg> for ModelPrecision {
    fn from(value: PrecisionArg) -> Self {
        match value {
            PrecisionArg::Full => ModelPrecision::Full,
            PrecisionArg::Half => ModelPrecision::Half,
        }
    }
}

/// Model artifact selection.
#[derive(Debug, Clone, Default, Args)]
pub struct ModelArgs {
    /// Weight record to load.
    #[arg(long)]
    pub model: Option<PathBuf>,
    /// Override the precision recorded in the manifest sidecar.
    #[arg(long, value_enum)]
    pub precision: Option<PrecisionArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleArg {
    ConsecutivePositive,
    PairedPositive,
}

impl From<RuleArg> for DebounceRule {
    fn from(value: RuleArg) -> Self {
        match value {
            RuleArg::ConsecutivePositive => DebounceRule::ConsecutivePositive,
            RuleArg::PairedPositive => DebounceRule::PairedPositive,
        }
    }
}

/// Monitoring knobs; anything given here wins over the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct MonitorArgs {
    /// Config file (defaults to `$POSTURE_MONITOR_CONFIG`, then `./posture-monitor.toml`).
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub sample_interval_ms: Option<u64>,
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
    /// Consecutive abnormal samples needed to raise the alert.
    #[arg(long)]
    pub alert_threshold: Option<u32>,
    /// Probability above which a sample is abnormal.
    #[arg(long)]
    pub decision_threshold: Option<f32>,
    #[arg(long, value_enum)]
    pub rule: Option<RuleArg>,
    /// Write per-sample JSON lines into this directory.
    #[arg(long)]
    pub record_dir: Option<PathBuf>,
    /// Also save each sampled frame as PNG (needs a record directory).
    #[arg(long, default_value_t = false)]
    pub save_frames: bool,
    /// Photo of the empty scene; background pixels are blanked before classification.
    #[arg(long)]
    pub background: Option<PathBuf>,
    /// Per-channel difference from the background that counts as subject.
    #[arg(long)]
    pub background_tolerance: Option<u8>,
}

/// Folds command-line overrides into settings loaded from the file. The
/// result still has to pass [`Settings::validate`].
pub fn apply_overrides(
    settings: &mut Settings,
    camera: &CameraArgs,
    model: &ModelArgs,
    args: &MonitorArgs,
) {
    if !camera.cameras.is_empty() {
        settings.camera_order = camera.cameras.clone();
    }
    match (camera.width, camera.height) {
        (Some(w), Some(h)) => settings.resolution = Some((w, h)),
        (Some(w), None) => {
            let h = settings.resolution.map(|r| r.1).unwrap_or(scale(w, 3, 4));
            settings.resolution = Some((w, h));
        }
        (None, Some(h)) => {
            let w = settings.resolution.map(|r| r.0).unwrap_or(scale(h, 4, 3));
            settings.resolution = Some((w, h));
        }
        (None, None) => {}
    }
    if camera.prefer_external {
        settings.acquire_policy = capture::AcquirePolicy::PreferExternal;
    }

    if let Some(path) = &model.model {
        settings.model_path = path.clone();
    }
    if let Some(precision) = model.precision {
        settings.model_precision = Some(precision.into());
    }

    if let Some(ms) = args.sample_interval_ms {
        settings.monitor.sample_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = args.poll_interval_ms {
        settings.monitor.poll_interval = Duration::from_millis(ms);
    }
    if let Some(n) = args.alert_threshold {
        settings.monitor.alert_threshold = n;
    }
    if let Some(t) = args.decision_threshold {
        settings.monitor.decision_threshold = t;
    }
    if let Some(rule) = args.rule {
        settings.monitor.rule = rule.into();
    }
    if let Some(dir) = &args.record_dir {
        settings.record_dir = Some(dir.clone());
    }
    if args.save_frames {
        settings.save_frames = true;
    }
    if let Some(path) = &args.background {
        settings.background = Some(path.clone());
    }
    if let Some(tolerance) = args.background_tolerance {
        settings.background_tolerance = tolerance;
    }
}

/// `value * num / den`, saturating at `u32::MAX`.
fn scale(value: u32, num: u64, den: u64) -> u32 {
    u32::try_from(u64::from(value) * num / den).unwrap_or(u32::MAX)
}
