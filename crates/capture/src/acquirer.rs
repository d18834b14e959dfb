use std::time::Instant;
use thiserror::Error;
use vision_core::interfaces::Frame;

use crate::device::{CaptureDevice, CaptureError, DeviceOpener};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AcquireError {
    #[error("no camera available (tried indices {tried:?})")]
    NoCameraAvailable { tried: Vec<i32> },
}

/// How candidate indices are turned into a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquirePolicy {
    /// First candidate, in the caller's order, that opens and yields a frame.
    #[default]
    Priority,
    /// Scan indices upward from 0 (bounded by the largest candidate) until
    /// one fails; require at least two usable cameras and take the last one
    /// found, which is usually the external USB camera.
    PreferExternal,
}

pub struct CameraAcquirer<O> {
    opener: O,
    policy: AcquirePolicy,
}

impl<O: DeviceOpener> CameraAcquirer<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            policy: AcquirePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AcquirePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> AcquirePolicy {
        self.policy
    }

    /// Opens the first usable camera according to the policy. Rejected
    /// devices are released before the next candidate is tried. The
    /// resolution is a hint: failing to apply it only logs a warning.
    pub fn acquire(
        &mut self,
        candidates: &[i32],
        resolution: Option<(u32, u32)>,
    ) -> Result<CameraHandle, AcquireError> {
        let order: Vec<i32> = match self.policy {
            AcquirePolicy::Priority => candidates.to_vec(),
            AcquirePolicy::PreferExternal => {
                let max_index = candidates.iter().copied().max().unwrap_or(-1);
                let found = self.scan(max_index);
                if found.len() < 2 {
                    tracing::error!(?found, "no external camera found");
                    let tried = (0..=max_index).take(found.len() + 1).collect();
                    return Err(AcquireError::NoCameraAvailable { tried });
                }
                found.last().copied().into_iter().collect()
            }
        };

        for index in order {
            let Some(mut device) = self.try_open(index) else {
                continue;
            };
            if let Some((width, height)) = resolution {
                if let Err(err) = device.set_resolution(width, height) {
                    tracing::warn!(index, width, height, %err, "resolution hint not applied");
                }
            }
            tracing::info!(index, policy = ?self.policy, "camera acquired");
            return Ok(CameraHandle::new(device));
        }
        tracing::error!(?candidates, "no usable camera");
        Err(AcquireError::NoCameraAvailable {
            tried: candidates.to_vec(),
        })
    }

    /// Usable indices from 0 upward, stopping at the first index that does
    /// not yield a frame or after `max_index`.
    pub fn scan(&mut self, max_index: i32) -> Vec<i32> {
        let mut found = Vec::new();
        for index in 0..=max_index {
            match self.try_open(index) {
                Some(mut device) => {
                    device.release();
                    found.push(index);
                }
                None => break,
            }
        }
        found
    }

    /// Opens `index` and keeps it only if it reports opened and reads a
    /// non-empty frame; otherwise releases it.
    fn try_open(&mut self, index: i32) -> Option<Box<dyn CaptureDevice>> {
        let mut device = match self.opener.open(index) {
            Ok(device) => device,
            Err(err) => {
                tracing::warn!(index, %err, "camera open failed");
                return None;
            }
        };
        if !device.is_opened() {
            tracing::debug!(index, "camera not opened");
            device.release();
            return None;
        }
        match device.read() {
            Ok(img) if img.width() > 0 && img.height() > 0 => {
                device.rewind();
                Some(device)
            }
            Ok(_) => {
                tracing::warn!(index, "camera opened but returned an empty frame");
                device.release();
                None
            }
            Err(err) => {
                tracing::warn!(index, %err, "camera opened but frame read failed");
                device.release();
                None
            }
        }
    }
}

/// Exclusive owner of an opened camera. The device is released exactly once:
/// by [`CameraHandle::release`] or, failing that, on drop.
pub struct CameraHandle {
    device: Option<Box<dyn CaptureDevice>>,
    index: i32,
    opened_at: Instant,
    next_frame_id: u64,
}

impl CameraHandle {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            index: device.index(),
            device: Some(device),
            opened_at: Instant::now(),
            next_frame_id: 0,
        }
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn is_released(&self) -> bool {
        self.device.is_none()
    }

    /// Reads the next frame; ids count up from 0 and timestamps are seconds
    /// since the handle was created.
    pub fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let timestamp = self.opened_at.elapsed().as_secs_f64();
        self.read_frame_at(timestamp)
    }

    /// Like [`CameraHandle::read_frame`], but stamps the frame with a
    /// caller-supplied time in seconds.
    pub fn read_frame_at(&mut self, timestamp: f64) -> Result<Frame, CaptureError> {
        let index = self.index;
        let device = self
            .device
            .as_mut()
            .ok_or(CaptureError::NotOpened { index })?;
        let image = device.read()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(CaptureError::EmptyFrame { index });
        }
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        Ok(Frame::new(id, timestamp, image))
    }

    pub fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.release();
            tracing::info!(index = self.index, "camera released");
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHandle")
            .field("index", &self.index)
            .field("released", &self.is_released())
            .field("next_frame_id", &self.next_frame_id)
            .finish()
    }
}
