use capture::{AcquirePolicy, DEFAULT_CAMERA_ORDER};
use data_contracts::artifacts::FINAL_MODEL_PATH;
use data_contracts::ModelPrecision;
use monitor::{DebounceRule, MonitorConfig, ReadFailurePolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use vision_core::segment::DEFAULT_TOLERANCE;

pub const DEFAULT_CONFIG_NAME: &str = "posture-monitor.toml";
pub const CONFIG_ENV: &str = "POSTURE_MONITOR_CONFIG";

const DEFAULT_RESOLUTION: (u32, u32) = (640, 480);
const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;
const DEFAULT_RETRY_MAX: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Fully resolved monitoring settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub camera_order: Vec<i32>,
    /// Resolution hint; `None` leaves the device default.
    pub resolution: Option<(u32, u32)>,
    pub acquire_policy: AcquirePolicy,
    pub monitor: MonitorConfig,
    pub model_path: PathBuf,
    /// Forced precision; `None` trusts the manifest sidecar.
    pub model_precision: Option<ModelPrecision>,
    pub record_dir: Option<PathBuf>,
    pub save_frames: bool,
    /// Still image of the empty scene; when set, frames are masked against
    /// it before classification.
    pub background: Option<PathBuf>,
    pub background_tolerance: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_order: DEFAULT_CAMERA_ORDER.to_vec(),
            resolution: Some(DEFAULT_RESOLUTION),
            acquire_policy: AcquirePolicy::Priority,
            monitor: MonitorConfig::default(),
            model_path: PathBuf::from(FINAL_MODEL_PATH),
            model_precision: None,
            record_dir: None,
            save_frames: false,
            background: None,
            background_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    camera: Option<CameraSection>,
    monitor: Option<MonitorSection>,
    model: Option<ModelSection>,
    recorder: Option<RecorderSection>,
    segmentation: Option<SegmentationSection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraSection {
    order: Option<Vec<i32>>,
    width: Option<u32>,
    height: Option<u32>,
    policy: Option<PolicyName>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum PolicyName {
    Priority,
    PreferExternal,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MonitorSection {
    sample_interval_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    alert_threshold: Option<u32>,
    decision_threshold: Option<f32>,
    rule: Option<DebounceRule>,
    read_failure: Option<ReadFailureMode>,
    retry_backoff_ms: Option<u64>,
    retry_max: Option<u32>,
}

/// File spelling of [`ReadFailurePolicy`]; the retry knobs sit beside it.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ReadFailureMode {
    Abort,
    Retry,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelSection {
    path: Option<String>,
    precision: Option<ModelPrecision>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RecorderSection {
    dir: Option<String>,
    save_frames: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SegmentationSection {
    background: Option<String>,
    tolerance: Option<u8>,
}

impl Settings {
    /// `explicit` (from `--config`) wins, then `$POSTURE_MONITOR_CONFIG`, then
    /// `./posture-monitor.toml`. A named file must exist; an absent default
    /// file means built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_path(&expand_path(&path));
        }
        let default = Path::new(DEFAULT_CONFIG_NAME);
        if default.exists() {
            return Self::from_path(default);
        }
        tracing::debug!("no config file found; using defaults");
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SettingsFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_file(file);
        settings.validate()?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    fn from_file(file: SettingsFile) -> Self {
        let defaults = Self::default();
        let camera = file.camera.unwrap_or_default();
        let monitor = file.monitor.unwrap_or_default();
        let model = file.model.unwrap_or_default();
        let recorder = file.recorder.unwrap_or_default();
        let segmentation = file.segmentation.unwrap_or_default();

        let resolution = match (camera.width, camera.height) {
            (None, None) => defaults.resolution,
            (w, h) => Some((
                w.unwrap_or(DEFAULT_RESOLUTION.0),
                h.unwrap_or(DEFAULT_RESOLUTION.1),
            )),
        };
        let read_failure = match monitor.read_failure {
            None | Some(ReadFailureMode::Abort) => ReadFailurePolicy::Abort,
            Some(ReadFailureMode::Retry) => ReadFailurePolicy::Retry {
                backoff: Duration::from_millis(
                    monitor.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
                ),
                max_consecutive: monitor.retry_max.unwrap_or(DEFAULT_RETRY_MAX),
            },
        };

        Settings {
            camera_order: camera.order.unwrap_or(defaults.camera_order),
            resolution,
            acquire_policy: match camera.policy {
                Some(PolicyName::PreferExternal) => AcquirePolicy::PreferExternal,
                Some(PolicyName::Priority) | None => AcquirePolicy::Priority,
            },
            monitor: MonitorConfig {
                sample_interval: monitor
                    .sample_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.monitor.sample_interval),
                poll_interval: monitor
                    .poll_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.monitor.poll_interval),
                alert_threshold: monitor
                    .alert_threshold
                    .unwrap_or(defaults.monitor.alert_threshold),
                decision_threshold: monitor
                    .decision_threshold
                    .unwrap_or(defaults.monitor.decision_threshold),
                rule: monitor.rule.unwrap_or(defaults.monitor.rule),
                read_failure,
            },
            model_path: model
                .path
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.model_path),
            model_precision: model.precision,
            record_dir: recorder.dir.map(|v| expand_path(&v)),
            save_frames: recorder.save_frames.unwrap_or(false),
            background: segmentation.background.map(|v| expand_path(&v)),
            background_tolerance: segmentation.tolerance.unwrap_or(DEFAULT_TOLERANCE),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera_order.is_empty() {
            return Err(invalid("camera.order", "at least one index is required"));
        }
        if let Some(&bad) = self.camera_order.iter().find(|&&i| i < 0) {
            return Err(invalid("camera.order", format!("negative index {bad}")));
        }
        if let Some((w, h)) = self.resolution {
            if w == 0 || h == 0 {
                return Err(invalid("camera.width/height", format!("{w}x{h} is empty")));
            }
        }
        let m = &self.monitor;
        if m.sample_interval.is_zero() {
            return Err(invalid("monitor.sample_interval_ms", "must be > 0"));
        }
        if m.poll_interval.is_zero() {
            return Err(invalid("monitor.poll_interval_ms", "must be > 0"));
        }
        if m.alert_threshold == 0 {
            return Err(invalid("monitor.alert_threshold", "must be >= 1"));
        }
        if !(m.decision_threshold > 0.0 && m.decision_threshold < 1.0) {
            return Err(invalid(
                "monitor.decision_threshold",
                format!("{} is outside (0, 1)", m.decision_threshold),
            ));
        }
        if let ReadFailurePolicy::Retry {
            max_consecutive: 0, ..
        } = m.read_failure
        {
            return Err(invalid("monitor.retry_max", "must be >= 1"));
        }
        if self.save_frames && self.record_dir.is_none() {
            return Err(invalid("recorder.save_frames", "needs recorder.dir"));
        }
        if self.model_path.as_os_str().is_empty() {
            return Err(invalid("model.path", "is empty"));
        }
        if let Some(path) = &self.background {
            if path.as_os_str().is_empty() {
                return Err(invalid("segmentation.background", "is empty"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Expands a leading `~` and `${VAR}` references. Unknown variables are kept
/// verbatim.
pub fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match std::env::var(key) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
