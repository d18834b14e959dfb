use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One classified sample as persisted by a sample recorder (one JSON line each).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleRecord {
    pub sample_index: u64,
    pub frame_id: u64,
    /// Seconds since the camera was opened.
    pub timestamp: f64,
    /// Raw abnormal-posture probability from the classifier.
    pub probability: f32,
    pub abnormal: bool,
    /// `max(p, 1 - p)`.
    pub confidence: f32,
    pub streak: u32,
    pub alert: bool,
    /// Relative path of the saved frame, when frames are kept.
    pub image: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("probability out of range: {0:?}")]
    InvalidProbability(f32),
    #[error("confidence out of range: {0:?}")]
    InvalidConfidence(f32),
    #[error("abnormal flag {abnormal} disagrees with probability {probability}")]
    LabelMismatch { probability: f32, abnormal: bool },
    #[error("alert raised with an empty streak")]
    AlertWithoutStreak,
    #[error("timestamp must be non-negative: {0}")]
    InvalidTimestamp(f64),
}

impl SampleRecord {
    /// Checks the record against the decision `threshold` it was produced with.
    pub fn validate(&self, threshold: f32) -> Result<(), ValidationError> {
        if self.probability.is_nan() || !(0.0..=1.0).contains(&self.probability) {
            return Err(ValidationError::InvalidProbability(self.probability));
        }
        if self.confidence.is_nan() || !(0.5..=1.0).contains(&self.confidence) {
            return Err(ValidationError::InvalidConfidence(self.confidence));
        }
        if (self.probability > threshold) != self.abnormal {
            return Err(ValidationError::LabelMismatch {
                probability: self.probability,
                abnormal: self.abnormal,
            });
        }
        if self.alert && self.streak == 0 {
            return Err(ValidationError::AlertWithoutStreak);
        }
        if self.timestamp.is_nan() || self.timestamp < 0.0 {
            return Err(ValidationError::InvalidTimestamp(self.timestamp));
        }
        Ok(())
    }
}
