use data_contracts::{ArtifactError, ModelManifest, ModelPrecision};
use models::checkpoint::{self, RecordPrecision};
use training::export::{BurnRecordConverter, ExportError, ModelConverter, Optimization};
use training::{PostureNet, PostureNetConfig, TrainBackend};

fn small_cfg() -> PostureNetConfig {
    PostureNetConfig {
        input_size: 32,
        hidden: 8,
        dropout: 0.5,
    }
}

#[test]
fn default_optimization_writes_half_precision_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("saved_model/final_model.bin");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();

    let device = Default::default();
    let model = PostureNet::<TrainBackend>::new(small_cfg(), &device);
    checkpoint::save(&model, &source, RecordPrecision::Full).unwrap();
    ModelManifest::new(32, 8, ModelPrecision::Full)
        .write_for(&source)
        .unwrap();

    let output = tmp.path().join("saved_model/model_quant.bin");
    let report = BurnRecordConverter::default()
        .convert(&source, &output, &[Optimization::Default])
        .unwrap();

    assert_eq!(report.precision, ModelPrecision::Half);
    assert!(output.exists());
    assert!(report.output_bytes > 0);
    assert!(report.output_bytes < report.source_bytes);

    let manifest = ModelManifest::read_for(&output).unwrap().unwrap();
    assert_eq!(manifest.precision, ModelPrecision::Half);
    assert_eq!(manifest.input_size, 32);

    checkpoint::load::<TrainBackend>(small_cfg(), &output, RecordPrecision::Half, &device)
        .expect("half-precision record loads back");
}

#[test]
fn missing_source_fails_before_writing() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("model_quant.bin");
    let err = BurnRecordConverter::new(small_cfg())
        .convert(&tmp.path().join("absent.bin"), &output, &[Optimization::Default])
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Artifact(ArtifactError::Missing { .. })
    ));
    assert!(!output.exists());
}
