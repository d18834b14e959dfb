#![allow(dead_code)]

use capture::{CameraHandle, CaptureDevice, CaptureError, SampleRecorder};
use data_contracts::SampleRecord;
use image::RgbImage;
use monitor::{Display, SampleOutcome};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use vision_core::interfaces::{Classifier, ClassifierError, Frame};

/// Camera that yields `frames` good reads (unbounded when `None`), then fails.
pub struct FakeCamera {
    pub frames_left: Option<u32>,
    pub releases: Rc<Cell<u32>>,
}

impl CaptureDevice for FakeCamera {
    fn index(&self) -> i32 {
        1
    }

    fn is_opened(&self) -> bool {
        true
    }

    fn read(&mut self) -> Result<RgbImage, CaptureError> {
        match self.frames_left.as_mut() {
            Some(0) => Err(CaptureError::ReadFailed {
                index: 1,
                reason: "unplugged".into(),
            }),
            Some(n) => {
                *n -= 1;
                Ok(RgbImage::new(8, 8))
            }
            None => Ok(RgbImage::new(8, 8)),
        }
    }

    fn set_resolution(&mut self, _width: u32, _height: u32) -> Result<(), CaptureError> {
        Ok(())
    }

    fn release(&mut self) {
        self.releases.set(self.releases.get() + 1);
    }
}

pub fn camera(frames: Option<u32>) -> (CameraHandle, Rc<Cell<u32>>) {
    let releases = Rc::new(Cell::new(0));
    let handle = CameraHandle::new(Box::new(FakeCamera {
        frames_left: frames,
        releases: releases.clone(),
    }));
    (handle, releases)
}

/// Returns scripted probabilities in order, then errors.
pub struct ScriptedClassifier {
    pub outputs: VecDeque<Result<f32, ClassifierError>>,
    pub calls: Rc<Cell<u32>>,
}

impl ScriptedClassifier {
    pub fn new(probabilities: &[f32]) -> Self {
        Self {
            outputs: probabilities.iter().map(|&p| Ok(p)).collect(),
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn constant(p: f32) -> Self {
        Self::new(&vec![p; 10_000])
    }
}

impl Classifier for ScriptedClassifier {
    fn predict(&mut self, _frame: &Frame) -> Result<f32, ClassifierError> {
        self.calls.set(self.calls.get() + 1);
        self.outputs
            .pop_front()
            .unwrap_or_else(|| Err(ClassifierError::Inference("script exhausted".into())))
    }
}

/// Requests quit once `quit_after` frames have been shown.
pub struct ScriptedDisplay {
    pub quit_after: Option<u64>,
    pub shown: Rc<Cell<u64>>,
}

impl ScriptedDisplay {
    pub fn quit_after(n: u64) -> Self {
        Self {
            quit_after: Some(n),
            shown: Rc::new(Cell::new(0)),
        }
    }

    pub fn never_quits() -> Self {
        Self {
            quit_after: None,
            shown: Rc::new(Cell::new(0)),
        }
    }
}

impl Display for ScriptedDisplay {
    fn show(&mut self, _frame: &Frame, _latest: Option<&SampleOutcome>) -> io::Result<()> {
        self.shown.set(self.shown.get() + 1);
        Ok(())
    }

    fn quit_requested(&mut self) -> bool {
        self.quit_after.is_some_and(|n| self.shown.get() >= n)
    }
}

#[derive(Clone, Default)]
pub struct MemoryRecorder {
    pub records: Rc<RefCell<Vec<SampleRecord>>>,
}

impl SampleRecorder for MemoryRecorder {
    fn record(&mut self, record: &SampleRecord, _frame: Option<&Frame>) -> io::Result<()> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}
