use capture::{CameraAcquirer, CameraHandle, DeviceOpener, SampleRecorder};
use vision_core::interfaces::Classifier;

use crate::clock::{CancelToken, Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::display::Display;
use crate::runner::{DebouncedClassificationLoop, SessionSummary};
use crate::MonitorError;

/// Everything one monitoring run owns. The camera is released exactly once
/// when the run ends, whichever way it ends.
pub struct MonitorSession {
    config: MonitorConfig,
    camera: CameraHandle,
    classifier: Box<dyn Classifier>,
    display: Box<dyn Display>,
    recorder: Option<Box<dyn SampleRecorder>>,
    clock: Box<dyn Clock>,
    cancel: CancelToken,
}

impl MonitorSession {
    pub fn new(
        config: MonitorConfig,
        camera: CameraHandle,
        classifier: Box<dyn Classifier>,
        display: Box<dyn Display>,
    ) -> Self {
        Self {
            config,
            camera,
            classifier,
            display,
            recorder: None,
            clock: Box::new(SystemClock::new()),
            cancel: CancelToken::new(),
        }
    }

    /// Acquires a camera from `candidates` and builds the session around it.
    /// The classifier is taken already loaded, so a missing model fails
    /// before any camera is touched.
    pub fn open<O: DeviceOpener>(
        acquirer: &mut CameraAcquirer<O>,
        candidates: &[i32],
        resolution: Option<(u32, u32)>,
        config: MonitorConfig,
        classifier: Box<dyn Classifier>,
        display: Box<dyn Display>,
    ) -> Result<Self, MonitorError> {
        config.validate()?;
        let camera = acquirer.acquire(candidates, resolution)?;
        Ok(Self::new(config, camera, classifier, display))
    }

    pub fn with_recorder(mut self, recorder: Box<dyn SampleRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn camera_index(&self) -> i32 {
        self.camera.index()
    }

    pub fn run(mut self) -> Result<SessionSummary, MonitorError> {
        let result = {
            let mut runner = DebouncedClassificationLoop::new(
                &self.config,
                self.classifier.as_mut(),
                self.clock.as_ref(),
                self.display.as_mut(),
            )
            .with_cancel_token(self.cancel.clone());
            if let Some(recorder) = self.recorder.as_mut() {
                runner = runner.with_recorder(recorder.as_mut());
            }
            runner.run(&mut self.camera)
        };
        self.camera.release();
        if let Err(err) = &result {
            tracing::error!(%err, "monitoring session failed");
        }
        result
    }
}
