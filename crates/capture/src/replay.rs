//! Replays still images as a camera, for demos and tests without hardware.

use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::device::{CaptureDevice, CaptureError, DeviceOpener};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Serves a fixed image sequence at one device index; every other index opens
/// in the not-opened state.
#[derive(Debug, Clone)]
pub struct ReplayOpener {
    index: i32,
    frames: Arc<Vec<RgbImage>>,
    looping: bool,
}

impl ReplayOpener {
    pub fn from_images(index: i32, frames: Vec<RgbImage>) -> Self {
        Self {
            index,
            frames: Arc::new(frames),
            looping: true,
        }
    }

    /// Loads every image in `dir` (sorted by file name) as device `index`.
    pub fn from_dir(index: i32, dir: &Path) -> Result<Self, CaptureError> {
        let open_err = |reason: String| CaptureError::Open { index, reason };
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| open_err(format!("{}: {e}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.iter().any(|k| ext.eq_ignore_ascii_case(k)))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let img = image::open(path)
                .map_err(|e| open_err(format!("{}: {e}", path.display())))?
                .to_rgb8();
            frames.push(img);
        }
        tracing::info!(index, dir = %dir.display(), frames = frames.len(), "replay source loaded");
        Ok(Self::from_images(index, frames))
    }

    /// Stop after the last image instead of wrapping around.
    pub fn once(mut self) -> Self {
        self.looping = false;
        self
    }
}

impl DeviceOpener for ReplayOpener {
    fn open(&mut self, index: i32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        Ok(Box::new(ReplayDevice {
            index,
            frames: self.frames.clone(),
            opened: index == self.index && !self.frames.is_empty(),
            cursor: 0,
            looping: self.looping,
            resolution: None,
        }))
    }
}

struct ReplayDevice {
    index: i32,
    frames: Arc<Vec<RgbImage>>,
    opened: bool,
    cursor: usize,
    looping: bool,
    resolution: Option<(u32, u32)>,
}

impl CaptureDevice for ReplayDevice {
    fn index(&self) -> i32 {
        self.index
    }

    fn is_opened(&self) -> bool {
        self.opened
    }

    fn read(&mut self) -> Result<RgbImage, CaptureError> {
        if !self.opened {
            return Err(CaptureError::NotOpened { index: self.index });
        }
        if self.cursor >= self.frames.len() {
            if !self.looping {
                return Err(CaptureError::ReadFailed {
                    index: self.index,
                    reason: "replay exhausted".into(),
                });
            }
            self.cursor = 0;
        }
        let frame = &self.frames[self.cursor];
        self.cursor += 1;
        Ok(match self.resolution {
            Some((w, h)) if frame.dimensions() != (w, h) => {
                image::imageops::resize(frame, w, h, image::imageops::FilterType::Triangle)
            }
            _ => frame.clone(),
        })
    }

    fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::Resolution {
                index: self.index,
                width,
                height,
                reason: "zero dimension".into(),
            });
        }
        self.resolution = Some((width, height));
        Ok(())
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn release(&mut self) {
        self.opened = false;
    }
}
