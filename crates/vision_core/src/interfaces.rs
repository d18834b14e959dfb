use image::{GrayImage, RgbImage};
use std::fmt;
use thiserror::Error;

/// Probabilities strictly above this value are classified as abnormal posture.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// A captured RGB8 image and its metadata. Lives for one loop iteration.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: u64,
    /// Seconds since capture started, as measured by the clock driving the loop.
    pub timestamp: f64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(id: u64, timestamp: f64, image: RgbImage) -> Self {
        Self {
            id,
            timestamp,
            image,
        }
    }

    /// Image dimensions (width, height).
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostureLabel {
    Normal,
    Abnormal,
}

impl fmt::Display for PostureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostureLabel::Normal => f.write_str("normal"),
            PostureLabel::Abnormal => f.write_str("abnormal"),
        }
    }
}

/// Classifier output reduced to a label and a display confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probability: f32,
    pub abnormal: bool,
    /// Always `max(p, 1 - p)`, so it lies in `[0.5, 1.0]`.
    pub confidence: f32,
}

impl Prediction {
    /// Labels `probability` against `threshold` using a strict `>` comparison,
    /// so a probability exactly at the threshold is normal.
    pub fn from_probability(probability: f32, threshold: f32) -> Result<Self, ClassifierError> {
        if probability.is_nan() || !(0.0..=1.0).contains(&probability) {
            return Err(ClassifierError::InvalidOutput(probability));
        }
        Ok(Self {
            probability,
            abnormal: probability > threshold,
            confidence: probability.max(1.0 - probability),
        })
    }

    pub fn label(&self) -> PostureLabel {
        if self.abnormal {
            PostureLabel::Abnormal
        } else {
            PostureLabel::Normal
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier produced an invalid probability: {0}")]
    InvalidOutput(f32),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("preprocessing failed: {0}")]
    Preprocess(String),
    #[error("segmentation failed: {0}")]
    Segmentation(String),
}

/// Binary posture classifier: probability in `[0, 1]` that the frame shows abnormal posture.
pub trait Classifier {
    fn predict(&mut self, frame: &Frame) -> Result<f32, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn predict(&mut self, frame: &Frame) -> Result<f32, ClassifierError> {
        (**self).predict(frame)
    }
}

/// Background remover: returns a mask with the same dimensions as the input,
/// non-zero where the pixel belongs to the subject.
pub trait SegmentationProvider {
    fn segment(&mut self, image: &RgbImage) -> Result<GrayImage, ClassifierError>;
}

impl<S: SegmentationProvider + ?Sized> SegmentationProvider for Box<S> {
    fn segment(&mut self, image: &RgbImage) -> Result<GrayImage, ClassifierError> {
        (**self).segment(image)
    }
}

/// Blanks background pixels with a [`SegmentationProvider`] before delegating.
pub struct MaskedClassifier<C, S> {
    inner: C,
    segmenter: S,
}

impl<C: Classifier, S: SegmentationProvider> MaskedClassifier<C, S> {
    pub fn new(inner: C, segmenter: S) -> Self {
        Self { inner, segmenter }
    }
}

impl<C: Classifier, S: SegmentationProvider> Classifier for MaskedClassifier<C, S> {
    fn predict(&mut self, frame: &Frame) -> Result<f32, ClassifierError> {
        let mask = self.segmenter.segment(&frame.image)?;
        let masked = crate::preprocess::apply_mask(&frame.image, &mask)?;
        self.inner
            .predict(&Frame::new(frame.id, frame.timestamp, masked))
    }
}
