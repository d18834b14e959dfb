//! Background removal against a still shot of the empty scene.

use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use std::path::Path;

use crate::interfaces::{ClassifierError, SegmentationProvider};

pub const DEFAULT_TOLERANCE: u8 = 30;

/// Marks a pixel as subject when any channel differs from the reference
/// background by more than `tolerance`. The reference is stretched to the
/// frame size on first use and cached.
#[derive(Debug, Clone)]
pub struct BackgroundReference {
    reference: RgbImage,
    scaled: Option<RgbImage>,
    tolerance: u8,
}

impl BackgroundReference {
    pub fn new(reference: RgbImage, tolerance: u8) -> Self {
        Self {
            reference,
            scaled: None,
            tolerance,
        }
    }

    pub fn open(path: &Path, tolerance: u8) -> Result<Self, ClassifierError> {
        let reference = image::open(path)
            .map_err(|e| {
                ClassifierError::Segmentation(format!(
                    "failed to read background {}: {e}",
                    path.display()
                ))
            })?
            .to_rgb8();
        if reference.width() == 0 || reference.height() == 0 {
            return Err(ClassifierError::Segmentation(format!(
                "background {} is empty",
                path.display()
            )));
        }
        Ok(Self::new(reference, tolerance))
    }

    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }

    fn reference_for(&mut self, width: u32, height: u32) -> &RgbImage {
        if self.reference.dimensions() == (width, height) {
            return &self.reference;
        }
        let stale = self
            .scaled
            .as_ref()
            .map_or(true, |s| s.dimensions() != (width, height));
        if stale {
            self.scaled = Some(image::imageops::resize(
                &self.reference,
                width,
                height,
                FilterType::Triangle,
            ));
        }
        self.scaled.as_ref().unwrap_or(&self.reference)
    }
}

impl SegmentationProvider for BackgroundReference {
    fn segment(&mut self, image: &RgbImage) -> Result<GrayImage, ClassifierError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ClassifierError::Segmentation("empty frame".into()));
        }
        let tolerance = self.tolerance;
        let reference = self.reference_for(width, height);
        let mut mask = GrayImage::new(width, height);
        for ((m, px), bg) in mask.pixels_mut().zip(image.pixels()).zip(reference.pixels()) {
            let foreground = px
                .0
                .iter()
                .zip(bg.0.iter())
                .any(|(a, b)| a.abs_diff(*b) > tolerance);
            *m = Luma([if foreground { 255 } else { 0 }]);
        }
        Ok(mask)
    }
}
