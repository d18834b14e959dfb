use capture::AcquirePolicy;
use cli_support::{ConfigError, Settings};
use data_contracts::ModelPrecision;
use monitor::{DebounceRule, ReadFailurePolicy};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

fn write(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("posture-monitor.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn full_file_is_applied() {
    let (_dir, path) = write(
        r#"
[camera]
order = [0, 2]
width = 1280
height = 720
policy = "prefer-external"

[monitor]
sample_interval_ms = 2000
poll_interval_ms = 50
alert_threshold = 3
decision_threshold = 0.6
rule = "paired-positive"
read_failure = "retry"
retry_backoff_ms = 100
retry_max = 4

[model]
path = "saved_model/model_quant.bin"
precision = "half"

[recorder]
dir = "runs/today"
save_frames = true

[segmentation]
background = "calib/empty_desk.png"
tolerance = 18
"#,
    );
    let s = Settings::from_path(&path).unwrap();
    assert_eq!(s.camera_order, vec![0, 2]);
    assert_eq!(s.resolution, Some((1280, 720)));
    assert_eq!(s.acquire_policy, AcquirePolicy::PreferExternal);
    assert_eq!(s.monitor.sample_interval, Duration::from_secs(2));
    assert_eq!(s.monitor.poll_interval, Duration::from_millis(50));
    assert_eq!(s.monitor.alert_threshold, 3);
    assert_eq!(s.monitor.rule, DebounceRule::PairedPositive);
    assert_eq!(
        s.monitor.read_failure,
        ReadFailurePolicy::Retry {
            backoff: Duration::from_millis(100),
            max_consecutive: 4
        }
    );
    assert_eq!(s.model_path, PathBuf::from("saved_model/model_quant.bin"));
    assert_eq!(s.model_precision, Some(ModelPrecision::Half));
    assert_eq!(s.record_dir, Some(PathBuf::from("runs/today")));
    assert!(s.save_frames);
    assert_eq!(s.background, Some(PathBuf::from("calib/empty_desk.png")));
    assert_eq!(s.background_tolerance, 18);
}

#[test]
fn partial_file_keeps_defaults() {
    let (_dir, path) = write("[monitor]\nalert_threshold = 4\n");
    let s = Settings::from_path(&path).unwrap();
    let defaults = Settings::default();
    assert_eq!(s.monitor.alert_threshold, 4);
    assert_eq!(s.camera_order, defaults.camera_order);
    assert_eq!(s.monitor.sample_interval, defaults.monitor.sample_interval);
    assert_eq!(s.monitor.read_failure, ReadFailurePolicy::Abort);
}

#[test]
fn zero_alert_threshold_is_rejected() {
    let (_dir, path) = write("[monitor]\nalert_threshold = 0\n");
    let err = Settings::from_path(&path).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "monitor.alert_threshold",
            ..
        }
    ));
}

#[test]
fn out_of_range_decision_threshold_is_rejected() {
    let (_dir, path) = write("[monitor]\ndecision_threshold = 1.0\n");
    assert!(matches!(
        Settings::from_path(&path),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn zero_interval_is_rejected() {
    let (_dir, path) = write("[monitor]\nsample_interval_ms = 0\n");
    assert!(Settings::from_path(&path).is_err());
}

#[test]
fn unknown_keys_are_parse_errors() {
    let (_dir, path) = write("[monitor]\nalert_treshold = 2\n");
    assert!(matches!(
        Settings::from_path(&path),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn named_file_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        Settings::load(Some(&missing)),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn paths_expand_home_and_env() {
    std::env::set_var("HOME", "/home/tester");
    std::env::set_var("POSTURE_RUNS", "/var/runs");
    let (_dir, path) = write(
        "[model]\npath = \"~/models/final.bin\"\n[recorder]\ndir = \"${POSTURE_RUNS}/a\"\n",
    );
    let s = Settings::from_path(&path).unwrap();
    assert_eq!(s.model_path, PathBuf::from("/home/tester/models/final.bin"));
    assert_eq!(s.record_dir, Some(PathBuf::from("/var/runs/a")));
}
