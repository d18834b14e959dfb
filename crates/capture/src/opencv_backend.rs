//! Webcam access through OpenCV's `VideoCapture`.

use image::RgbImage;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH};

use crate::device::{CaptureDevice, CaptureError, DeviceOpener};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvOpener;

impl DeviceOpener for OpenCvOpener {
    fn open(&mut self, index: i32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let capture = VideoCapture::new(index, CAP_ANY).map_err(|e| CaptureError::Open {
            index,
            reason: e.to_string(),
        })?;
        Ok(Box::new(OpenCvDevice { index, capture }))
    }
}

struct OpenCvDevice {
    index: i32,
    capture: VideoCapture,
}

impl CaptureDevice for OpenCvDevice {
    fn index(&self) -> i32 {
        self.index
    }

    fn is_opened(&self) -> bool {
        self.capture.is_opened().unwrap_or(false)
    }

    fn read(&mut self) -> Result<RgbImage, CaptureError> {
        let index = self.index;
        let read_err = |e: opencv::Error| CaptureError::ReadFailed {
            index,
            reason: e.to_string(),
        };
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame).map_err(read_err)? || frame.empty() {
            return Err(CaptureError::EmptyFrame { index });
        }
        let mut rgb = Mat::default();
        opencv::imgproc::cvt_color_def(&frame, &mut rgb, opencv::imgproc::COLOR_BGR2RGB)
            .map_err(read_err)?;
        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb.data_bytes().map_err(read_err)?;
        RgbImage::from_raw(width, height, data.to_vec()).ok_or(CaptureError::ReadFailed {
            index,
            reason: format!("frame buffer does not match {width}x{height} RGB"),
        })
    }

    fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        let set = |cap: &mut VideoCapture, prop, value: u32| {
            cap.set(prop, value as f64).unwrap_or(false)
        };
        let ok_w = set(&mut self.capture, CAP_PROP_FRAME_WIDTH, width);
        let ok_h = set(&mut self.capture, CAP_PROP_FRAME_HEIGHT, height);
        if ok_w && ok_h {
            Ok(())
        } else {
            Err(CaptureError::Resolution {
                index: self.index,
                width,
                height,
                reason: "driver refused the property".into(),
            })
        }
    }

    fn release(&mut self) {
        if let Err(err) = self.capture.release() {
            tracing::warn!(index = self.index, %err, "VideoCapture release failed");
        }
    }
}
