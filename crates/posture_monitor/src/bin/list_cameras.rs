use clap::Parser;
use capture::{CameraAcquirer, DeviceOpener, ReplayOpener};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "list_cameras", about = "List camera indices that open and deliver a frame")]
struct Args {
    /// Highest index to try.
    #[arg(long, default_value_t = 9)]
    max_index: i32,
    /// Scan a replay directory (served as camera 0) instead of hardware.
    #[arg(long)]
    replay_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    let found = match &args.replay_dir {
        Some(dir) => scan(ReplayOpener::from_dir(0, dir)?, args.max_index),
        None => scan_hardware(args.max_index)?,
    };
    if found.is_empty() {
        anyhow::bail!("no usable camera found in 0..={}", args.max_index);
    }
    for index in &found {
        println!("camera {index}: ok");
    }
    Ok(())
}

fn scan<O: DeviceOpener>(opener: O, max_index: i32) -> Vec<i32> {
    CameraAcquirer::new(opener).scan(max_index)
}

#[cfg(feature = "opencv")]
fn scan_hardware(max_index: i32) -> anyhow::Result<Vec<i32>> {
    Ok(scan(capture::OpenCvOpener, max_index))
}

#[cfg(not(feature = "opencv"))]
fn scan_hardware(_max_index: i32) -> anyhow::Result<Vec<i32>> {
    anyhow::bail!("built without the `opencv` feature; pass --replay-dir or rebuild with --features opencv")
}
