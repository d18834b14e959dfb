//! Wiring for the `monitor` binary: config → classifier → camera → session.

use anyhow::Context;
use capture::{CameraAcquirer, DeviceOpener, JsonlRecorder};
use cli_support::Settings;
use clap::ValueEnum;
use data_contracts::ArtifactPaths;
use inference::{ArtifactSpec, ClassifierFactory};
use monitor::{CancelToken, Clock, Display, MonitorSession, SessionSummary};
use vision_core::interfaces::{Classifier, MaskedClassifier};
use vision_core::segment::BackgroundReference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisplayKind {
    /// Log status changes only.
    Headless,
    /// Status line in the terminal; `q` quits.
    Terminal,
    /// OpenCV window with the overlay (needs the `opencv` feature).
    Window,
}

impl DisplayKind {
    pub fn build(self) -> anyhow::Result<Box<dyn Display>> {
        match self {
            DisplayKind::Headless => Ok(Box::new(monitor::HeadlessDisplay::new())),
            DisplayKind::Terminal => Ok(Box::new(
                monitor::TerminalDisplay::new().context("failed to enter terminal raw mode")?,
            )),
            #[cfg(feature = "opencv")]
            DisplayKind::Window => Ok(Box::new(
                monitor::WindowDisplay::new("Posture Monitor")
                    .context("failed to open display window")?,
            )),
            #[cfg(not(feature = "opencv"))]
            DisplayKind::Window => {
                anyhow::bail!("window display needs the `opencv` feature; use --display terminal")
            }
        }
    }
}

/// Loads the configured model. Runs before any camera is touched, so a
/// missing artifact never leaves a device open.
pub fn build_classifier(settings: &Settings) -> anyhow::Result<Box<dyn Classifier>> {
    ArtifactPaths::require(&settings.model_path)?;
    let mut spec = ArtifactSpec::new(&settings.model_path);
    if let Some(precision) = settings.model_precision {
        spec = spec.with_precision(precision);
    }
    let classifier = ClassifierFactory
        .build(&spec)
        .with_context(|| format!("failed to load model {}", settings.model_path.display()))?;
    tracing::info!(model = %settings.model_path.display(), "classifier ready");
    match &settings.background {
        None => Ok(classifier),
        Some(path) => {
            let segmenter = BackgroundReference::open(path, settings.background_tolerance)?;
            tracing::info!(
                background = %path.display(),
                tolerance = settings.background_tolerance,
                "background masking enabled"
            );
            Ok(Box::new(MaskedClassifier::new(classifier, segmenter)))
        }
    }
}

/// Cancels `token` on Ctrl-C or SIGTERM.
pub fn cancel_on_interrupt(token: &CancelToken) -> anyhow::Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received; stopping session");
        token.cancel();
    })
    .context("failed to install interrupt handler")
}

/// Runs one monitoring session end to end. Cancelling `cancel` ends the
/// loop at its next tick and the camera is released on the way out.
pub fn run_monitor<O: DeviceOpener>(
    settings: &Settings,
    opener: O,
    display: Box<dyn Display>,
    clock: Box<dyn Clock>,
    cancel: CancelToken,
) -> anyhow::Result<SessionSummary> {
    settings.validate()?;
    let classifier = build_classifier(settings)?;

    let mut acquirer = CameraAcquirer::new(opener).with_policy(settings.acquire_policy);
    let mut session = MonitorSession::open(
        &mut acquirer,
        &settings.camera_order,
        settings.resolution,
        settings.monitor.clone(),
        classifier,
        display,
    )?
    .with_clock(clock)
    .with_cancel_token(cancel);

    if let Some(dir) = &settings.record_dir {
        let recorder = JsonlRecorder::create(dir, settings.save_frames)
            .with_context(|| format!("failed to create record dir {}", dir.display()))?
            .with_threshold(settings.monitor.decision_threshold);
        tracing::info!(log = %recorder.log_path().display(), "recording samples");
        session = session.with_recorder(Box::new(recorder));
    }

    Ok(session.run()?)
}
