use image::RgbImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera {index} could not be opened: {reason}")]
    Open { index: i32, reason: String },
    #[error("camera {index} is not open")]
    NotOpened { index: i32 },
    #[error("frame read failed on camera {index}: {reason}")]
    ReadFailed { index: i32, reason: String },
    #[error("camera {index} returned an empty frame")]
    EmptyFrame { index: i32 },
    #[error("camera {index} rejected resolution {width}x{height}: {reason}")]
    Resolution {
        index: i32,
        width: u32,
        height: u32,
        reason: String,
    },
}

/// An opened (or attempted) video-capture device.
pub trait CaptureDevice {
    fn index(&self) -> i32;
    fn is_opened(&self) -> bool;
    /// Grabs and decodes the next frame as RGB8.
    fn read(&mut self) -> Result<RgbImage, CaptureError>;
    fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), CaptureError>;
    /// Restarts a finite source at its first frame. Live cameras ignore it.
    fn rewind(&mut self) {}
    /// Releases the underlying hardware. Must tolerate repeated calls.
    fn release(&mut self);
}

/// Opens capture devices by index. Like a raw `VideoCapture`, a device may be
/// returned in a not-opened state; callers check [`CaptureDevice::is_opened`].
pub trait DeviceOpener {
    fn open(&mut self, index: i32) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}

impl<O: DeviceOpener + ?Sized> DeviceOpener for Box<O> {
    fn open(&mut self, index: i32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        (**self).open(index)
    }
}
