use data_contracts::{ModelManifest, ModelPrecision};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use training::util::{run_train, BackendKind, TrainArgs};

fn write_class(root: &Path, class: &str, color: [u8; 3], count: usize) {
    let dir = root.join(class);
    fs::create_dir_all(&dir).unwrap();
    for i in 0..count {
        RgbImage::from_pixel(40, 30, Rgb(color))
            .save(dir.join(format!("img_{i}.png")))
            .unwrap();
    }
}

fn tiny_args(root: &Path) -> TrainArgs {
    TrainArgs {
        dataset_root: root.join("dataset"),
        positive_class: "abnormal".into(),
        input_size: 32,
        hidden: 8,
        epochs: 2,
        batch_size: 4,
        lr: 1e-3,
        validation_split: 0.2,
        no_augment: false,
        seed: 7,
        backend: BackendKind::NdArray,
        checkpoint_out: root.join("saved_model/final_model.bin"),
        best_checkpoint_out: root.join("best_model.bin"),
        background: None,
        background_tolerance: 30,
    }
}

#[test]
fn train_writes_final_and_best_checkpoints() {
    let tmp = tempfile::tempdir().unwrap();
    let dataset = tmp.path().join("dataset");
    write_class(&dataset, "abnormal", [200, 30, 30], 5);
    write_class(&dataset, "normal", [30, 200, 30], 5);

    let args = tiny_args(tmp.path());
    let report = run_train(args.clone()).expect("training should succeed");

    assert_eq!(report.epochs.len(), 2);
    assert!(report.best_epoch.is_some());
    assert!(report.epochs.iter().all(|e| e.train_loss.is_finite()));
    assert!(report.epochs.iter().all(|e| e.validation.map(|v| v.samples) == Some(2)));
    assert!(args.checkpoint_out.exists());
    assert!(args.best_checkpoint_out.exists());

    let manifest = ModelManifest::read_for(&args.checkpoint_out)
        .unwrap()
        .expect("manifest written next to the final model");
    assert_eq!(manifest.input_size, 32);
    assert_eq!(manifest.hidden, 8);
    assert_eq!(manifest.precision, ModelPrecision::Full);
    assert!(ModelManifest::read_for(&args.best_checkpoint_out)
        .unwrap()
        .is_some());
}

#[test]
fn train_fails_on_missing_dataset() {
    let tmp = tempfile::tempdir().unwrap();
    let args = tiny_args(tmp.path());
    assert!(run_train(args.clone()).is_err());
    assert!(!args.checkpoint_out.exists());
}

#[test]
fn input_size_below_network_minimum_is_rejected_up_front() {
    let tmp = tempfile::tempdir().unwrap();
    let dataset = tmp.path().join("dataset");
    write_class(&dataset, "abnormal", [200, 30, 30], 3);
    write_class(&dataset, "normal", [30, 200, 30], 3);
    let args = TrainArgs {
        input_size: 16,
        ..tiny_args(tmp.path())
    };
    let err = run_train(args.clone()).unwrap_err();
    assert!(err.to_string().contains("--input-size 16"), "{err}");
    assert!(!args.checkpoint_out.exists());
}

#[test]
fn train_with_background_masking_writes_checkpoints() {
    let tmp = tempfile::tempdir().unwrap();
    let dataset = tmp.path().join("dataset");
    write_class(&dataset, "abnormal", [200, 30, 30], 3);
    write_class(&dataset, "normal", [30, 200, 30], 3);
    let background = tmp.path().join("empty.png");
    RgbImage::from_pixel(40, 30, Rgb([30, 30, 30])).save(&background).unwrap();
    let args = TrainArgs {
        epochs: 1,
        background: Some(background),
        ..tiny_args(tmp.path())
    };
    run_train(args.clone()).expect("masked training should succeed");
    assert!(args.checkpoint_out.exists());
}

#[test]
fn unreadable_background_fails_before_training() {
    let tmp = tempfile::tempdir().unwrap();
    let dataset = tmp.path().join("dataset");
    write_class(&dataset, "abnormal", [200, 30, 30], 3);
    write_class(&dataset, "normal", [30, 200, 30], 3);
    let args = TrainArgs {
        background: Some(tmp.path().join("missing.png")),
        ..tiny_args(tmp.path())
    };
    assert!(run_train(args.clone()).is_err());
    assert!(!args.checkpoint_out.exists());
}
