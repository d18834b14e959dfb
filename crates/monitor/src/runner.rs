use capture::{CameraHandle, SampleRecorder};
use data_contracts::SampleRecord;
use std::time::Duration;
use vision_core::interfaces::{Classifier, Frame, Prediction};

use crate::clock::{CancelToken, Clock};
use crate::config::{MonitorConfig, ReadFailurePolicy};
use crate::debounce::DebounceState;
use crate::display::Display;
use crate::MonitorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Between sampling instants; the last result stays on screen.
    Waiting,
    Classifying,
    /// Debounce threshold met on the latest sample.
    Alert,
}

/// Result of one classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutcome {
    pub sample_index: u64,
    pub frame_id: u64,
    pub prediction: Prediction,
    pub streak: u32,
    pub alert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Quit requested by the user or through a [`CancelToken`].
    Cancelled,
    /// A frame read failed and the read-failure policy gave up.
    FrameReadFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub end_reason: EndReason,
    pub frames_polled: u64,
    pub samples: u64,
    /// Transitions into the alert state.
    pub alerts_raised: u64,
    pub last_outcome: Option<SampleOutcome>,
}

/// Samples a frame every `sample_interval`, classifies it and debounces the
/// labels into an alert, while polling the camera and the quit signal every
/// `poll_interval`.
pub struct DebouncedClassificationLoop<'a> {
    config: &'a MonitorConfig,
    classifier: &'a mut dyn Classifier,
    clock: &'a dyn Clock,
    display: &'a mut dyn Display,
    recorder: Option<&'a mut dyn SampleRecorder>,
    cancel: CancelToken,
    debounce: DebounceState,
    state: LoopState,
}

impl<'a> DebouncedClassificationLoop<'a> {
    pub fn new(
        config: &'a MonitorConfig,
        classifier: &'a mut dyn Classifier,
        clock: &'a dyn Clock,
        display: &'a mut dyn Display,
    ) -> Self {
        Self {
            config,
            classifier,
            clock,
            display,
            recorder: None,
            cancel: CancelToken::new(),
            debounce: DebounceState::new(config.rule, config.alert_threshold),
            state: LoopState::Waiting,
        }
    }

    pub fn with_recorder(mut self, recorder: &'a mut dyn SampleRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs until cancelled or until frame reads give up. A classifier
    /// failure ends the run with an error. The camera is borrowed; releasing
    /// it is the owner's job.
    pub fn run(&mut self, camera: &mut CameraHandle) -> Result<SessionSummary, MonitorError> {
        self.config.validate()?;
        let mut summary = SessionSummary {
            end_reason: EndReason::Cancelled,
            frames_polled: 0,
            samples: 0,
            alerts_raised: 0,
            last_outcome: None,
        };
        let mut last_sample: Option<Duration> = None;
        let mut read_failures = 0u32;
        let started = self.clock.now();

        tracing::info!(
            camera = camera.index(),
            sample_interval_ms = self.config.sample_interval.as_millis() as u64,
            alert_threshold = self.config.alert_threshold,
            rule = ?self.config.rule,
            "monitoring started"
        );

        loop {
            if self.cancel.is_cancelled() || self.display.quit_requested() {
                summary.end_reason = EndReason::Cancelled;
                break;
            }

            let now = self.clock.now();
            let elapsed = now.saturating_sub(started).as_secs_f64();
            let frame = match camera.read_frame_at(elapsed) {
                Ok(frame) => {
                    read_failures = 0;
                    frame
                }
                Err(err) => match self.config.read_failure {
                    ReadFailurePolicy::Abort => {
                        tracing::warn!(%err, "frame read failed; ending session");
                        summary.end_reason = EndReason::FrameReadFailed;
                        break;
                    }
                    ReadFailurePolicy::Retry {
                        backoff,
                        max_consecutive,
                    } => {
                        read_failures += 1;
                        if read_failures >= max_consecutive {
                            tracing::warn!(%err, read_failures, "frame reads exhausted; ending session");
                            summary.end_reason = EndReason::FrameReadFailed;
                            break;
                        }
                        tracing::warn!(%err, read_failures, "frame read failed; retrying");
                        self.clock.sleep(backoff);
                        continue;
                    }
                },
            };
            summary.frames_polled += 1;

            let due = match last_sample {
                None => true,
                Some(at) => now.saturating_sub(at) >= self.config.sample_interval,
            };
            if due {
                let was_alert = self.debounce.is_alert();
                let outcome = self.sample(summary.samples, &frame)?;
                if outcome.alert && !was_alert {
                    summary.alerts_raised += 1;
                }
                summary.samples += 1;
                summary.last_outcome = Some(outcome);
                last_sample = Some(now);
            }

            self.display
                .show(&frame, summary.last_outcome.as_ref())
                .map_err(MonitorError::Display)?;
            self.clock.sleep(self.config.poll_interval);
        }

        tracing::info!(
            reason = ?summary.end_reason,
            frames = summary.frames_polled,
            samples = summary.samples,
            alerts = summary.alerts_raised,
            "monitoring stopped"
        );
        Ok(summary)
    }

    fn sample(&mut self, sample_index: u64, frame: &Frame) -> Result<SampleOutcome, MonitorError> {
        self.state = LoopState::Classifying;
        let classified = self
            .classifier
            .predict(frame)
            .and_then(|p| Prediction::from_probability(p, self.config.decision_threshold));
        let prediction = match classified {
            Ok(prediction) => prediction,
            Err(source) => {
                tracing::error!(sample_index, frame_id = frame.id, %source, "classifier failure");
                return Err(MonitorError::Classifier {
                    sample_index,
                    source,
                });
            }
        };

        let update = self.debounce.observe(prediction.abnormal);
        self.state = if update.alert {
            LoopState::Alert
        } else {
            LoopState::Waiting
        };
        let outcome = SampleOutcome {
            sample_index,
            frame_id: frame.id,
            prediction,
            streak: update.streak,
            alert: update.alert,
        };
        if outcome.alert {
            tracing::warn!(
                sample_index,
                streak = outcome.streak,
                confidence = prediction.confidence,
                "abnormal posture alert"
            );
        } else {
            tracing::info!(
                sample_index,
                label = %prediction.label(),
                confidence = prediction.confidence,
                streak = outcome.streak,
                "sample classified"
            );
        }

        if let Some(recorder) = self.recorder.as_mut() {
            let record = SampleRecord {
                sample_index,
                frame_id: frame.id,
                timestamp: frame.timestamp,
                probability: prediction.probability,
                abnormal: prediction.abnormal,
                confidence: prediction.confidence,
                streak: outcome.streak,
                alert: outcome.alert,
                image: None,
            };
            if let Err(err) = recorder.record(&record, Some(frame)) {
                tracing::warn!(sample_index, %err, "failed to record sample");
            }
        }
        Ok(outcome)
    }
}
