//! Camera acquisition and capture plumbing.
//!
//! Devices are reached through [`DeviceOpener`]/[`CaptureDevice`] so the
//! acquisition policy and the monitoring loop can run against replayed images
//! or scripted fakes as easily as against a webcam.

pub mod acquirer;
pub mod device;
#[cfg(feature = "opencv")]
pub mod opencv_backend;
pub mod recorder;
pub mod replay;

pub use acquirer::{AcquireError, AcquirePolicy, CameraAcquirer, CameraHandle};
pub use device::{CaptureDevice, CaptureError, DeviceOpener};
#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvOpener;
pub use recorder::{JsonlRecorder, SampleRecorder};
pub use replay::ReplayOpener;

/// Default candidate order: external USB camera first, then the built-in one.
pub const DEFAULT_CAMERA_ORDER: [i32; 4] = [1, 0, 2, 3];
