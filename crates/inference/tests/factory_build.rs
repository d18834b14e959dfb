use data_contracts::{ArtifactError, ModelManifest, ModelPrecision};
use image::{Rgb, RgbImage};
use inference::prelude::*;
use models::checkpoint::{self, RecordPrecision};
use models::{PostureNet, PostureNetConfig};
use std::path::{Path, PathBuf};
use vision_core::interfaces::{Classifier, Frame, Prediction, DECISION_THRESHOLD};

fn write_artifact(dir: &Path, name: &str, precision: ModelPrecision) -> PathBuf {
    let path = dir.join(name);
    let cfg = PostureNetConfig {
        input_size: 32,
        hidden: 8,
        dropout: 0.5,
    };
    let device = Default::default();
    let model = PostureNet::<InferenceBackend>::new(cfg, &device);
    let record = match precision {
        ModelPrecision::Full => RecordPrecision::Full,
        ModelPrecision::Half => RecordPrecision::Half,
    };
    checkpoint::save(&model, &path, record).unwrap();
    ModelManifest::new(32, 8, precision).write_for(&path).unwrap();
    path
}

fn frame() -> Frame {
    Frame::new(3, 0.25, RgbImage::from_pixel(64, 48, Rgb([120, 90, 60])))
}

#[test]
fn missing_artifact_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = ArtifactSpec::new(tmp.path().join("saved_model/model_quant.bin"));
    let err = ClassifierFactory.build(&spec).err().expect("must fail");
    assert!(matches!(
        err,
        InferenceError::Artifact(ArtifactError::Missing { .. })
    ));
}

#[test]
fn full_precision_artifact_yields_probability() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_artifact(tmp.path(), "final_model.bin", ModelPrecision::Full);
    let mut classifier = ClassifierFactory.build(&ArtifactSpec::new(&path)).unwrap();
    let p = classifier.predict(&frame()).unwrap();
    assert!(Prediction::from_probability(p, DECISION_THRESHOLD).is_ok());
}

#[test]
fn half_precision_artifact_runs_through_interpreter() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_artifact(tmp.path(), "model_quant.bin", ModelPrecision::Half);
    let mut classifier = ClassifierFactory.build(&ArtifactSpec::new(&path)).unwrap();
    let p = classifier.predict(&frame()).unwrap();
    assert!((0.0..=1.0).contains(&p));
}

#[test]
fn interpreter_enforces_call_order_and_shapes() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_artifact(tmp.path(), "model_quant.bin", ModelPrecision::Half);
    let mut interp = QuantizedInterpreter::load(&path).unwrap();
    assert_eq!(interp.input_shape(), [1, 3, 32, 32]);

    let data = vec![0.5f32; interp.input_len()];
    assert!(matches!(
        interp.set_input(0, &data),
        Err(InferenceError::NotAllocated)
    ));

    interp.allocate_tensors();
    assert!(matches!(
        interp.set_input(1, &data),
        Err(InferenceError::TensorIndex { index: 1, .. })
    ));
    assert!(matches!(
        interp.set_input(0, &data[1..]),
        Err(InferenceError::InputLength { .. })
    ));
    assert!(matches!(interp.output(0), Err(InferenceError::NotInvoked)));

    interp.set_input(0, &data).unwrap();
    interp.invoke().unwrap();
    let p = interp.output(0).unwrap();
    assert!((0.0..=1.0).contains(&p));
    assert!(interp.output(1).is_err());
}

#[test]
fn burn_classifier_reads_input_size_from_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_artifact(tmp.path(), "best_model.bin", ModelPrecision::Full);
    let classifier = BurnPostureClassifier::load(&path).unwrap();
    assert_eq!(classifier.input_size(), 32);
}
