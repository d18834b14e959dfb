use anyhow::Context;
use capture::ReplayOpener;
use clap::Parser;
use cli_support::common::{apply_overrides, CameraArgs, ModelArgs, MonitorArgs};
use cli_support::Settings;
use monitor::{CancelToken, Clock, EndReason, ManualClock};
use posture_monitor::{cancel_on_interrupt, run_monitor, DisplayKind};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "monitor",
    about = "Watch a webcam and alert on sustained abnormal posture"
)]
struct Args {
    #[command(flatten)]
    camera: CameraArgs,
    #[command(flatten)]
    model: ModelArgs,
    #[command(flatten)]
    monitor: MonitorArgs,
    /// Where to show frames (default: window with `opencv`, terminal otherwise,
    /// headless when replaying).
    #[arg(long, value_enum)]
    display: Option<DisplayKind>,
}

fn main() -> anyhow::Result<ExitCode> {
    cli_support::init_tracing();
    let args = Args::parse();

    let mut settings = Settings::load(args.monitor.config.as_deref())?;
    apply_overrides(&mut settings, &args.camera, &args.model, &args.monitor);
    settings.validate()?;

    let replaying = args.camera.replay_dir.is_some();
    let display = args
        .display
        .unwrap_or(if replaying {
            DisplayKind::Headless
        } else if cfg!(feature = "opencv") {
            DisplayKind::Window
        } else {
            DisplayKind::Terminal
        })
        .build()?;

    let cancel = CancelToken::new();
    cancel_on_interrupt(&cancel)?;

    let summary = match &args.camera.replay_dir {
        Some(dir) => {
            let opener = ReplayOpener::from_dir(0, dir)
                .with_context(|| format!("failed to load replay frames from {}", dir.display()))?
                .once();
            let clock: Box<dyn Clock> = Box::new(ManualClock::new());
            run_monitor(&settings, opener, display, clock, cancel)?
        }
        None => live(&settings, display, cancel)?,
    };

    println!(
        "Session ended ({:?}): frames={}, samples={}, alerts={}",
        summary.end_reason, summary.frames_polled, summary.samples, summary.alerts_raised
    );
    if summary.end_reason == EndReason::FrameReadFailed && !replaying {
        eprintln!("camera stopped delivering frames");
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(feature = "opencv")]
fn live(
    settings: &Settings,
    display: Box<dyn monitor::Display>,
    cancel: CancelToken,
) -> anyhow::Result<monitor::SessionSummary> {
    run_monitor(
        settings,
        capture::OpenCvOpener,
        display,
        Box::new(monitor::SystemClock::new()),
        cancel,
    )
}

#[cfg(not(feature = "opencv"))]
fn live(
    _settings: &Settings,
    _display: Box<dyn monitor::Display>,
    _cancel: CancelToken,
) -> anyhow::Result<monitor::SessionSummary> {
    anyhow::bail!("built without the `opencv` feature; pass --replay-dir or rebuild with --features opencv")
}
