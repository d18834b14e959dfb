//! Image preparation shared by training and inference: background masking,
//! square resize and CHW normalization.

use image::imageops::FilterType;
use image::{GrayImage, RgbImage};

use crate::interfaces::{ClassifierError, Frame};

/// Mask values above this are foreground.
const MASK_CUTOFF: u8 = 127;

/// Zeroes every pixel whose mask value is background.
pub fn apply_mask(image: &RgbImage, mask: &GrayImage) -> Result<RgbImage, ClassifierError> {
    if image.dimensions() != mask.dimensions() {
        return Err(ClassifierError::Segmentation(format!(
            "mask is {}x{}, image is {}x{}",
            mask.width(),
            mask.height(),
            image.width(),
            image.height()
        )));
    }
    let mut out = image.clone();
    for (pixel, m) in out.pixels_mut().zip(mask.pixels()) {
        if m[0] <= MASK_CUTOFF {
            pixel.0 = [0, 0, 0];
        }
    }
    Ok(out)
}

/// Stretches to `side`x`side` without preserving aspect ratio.
pub fn resize_square(image: &RgbImage, side: u32) -> RgbImage {
    if image.dimensions() == (side, side) {
        return image.clone();
    }
    image::imageops::resize(image, side, side, FilterType::Triangle)
}

/// CHW layout, normalized to [0, 1].
pub fn to_chw(image: &RgbImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let plane = (width * height) as usize;
    let mut chw = vec![0.0f32; plane * 3];
    for (x, y, pixel) in image.enumerate_pixels() {
        let base = (y * width + x) as usize;
        chw[base] = pixel[0] as f32 / 255.0;
        chw[plane + base] = pixel[1] as f32 / 255.0;
        chw[2 * plane + base] = pixel[2] as f32 / 255.0;
    }
    chw
}

/// Model input for a single frame: resized to `side` and flattened as `[3, side, side]`.
pub fn frame_to_input(frame: &Frame, side: u32) -> Result<Vec<f32>, ClassifierError> {
    let (w, h) = frame.size();
    if w == 0 || h == 0 {
        return Err(ClassifierError::Preprocess(format!(
            "frame {} is empty ({w}x{h})",
            frame.id
        )));
    }
    Ok(to_chw(&resize_square(&frame.image, side)))
}
