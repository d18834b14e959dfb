//! Image augmentation applied to training samples.

use image::RgbImage;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct AugmentConfig {
    /// Probability of applying a horizontal flip.
    pub flip_horizontal_prob: f32,
    /// Max translation as a fraction of width/height (0 disables).
    pub shift_fraction: f32,
    /// Zoom range: per-axis scale is drawn from `[1 - zoom_range, 1 + zoom_range]` (0 disables).
    pub zoom_range: f32,
    /// Max rotation in degrees, either direction (0 disables).
    pub rotation_degrees: f32,
    /// Max shear angle in degrees, either direction (0 disables).
    pub shear_degrees: f32,
    /// Probability of applying a light color jitter (brightness/contrast).
    pub color_jitter_prob: f32,
    /// Max jitter scale for brightness/contrast.
    pub color_jitter_strength: f32,
    /// Probability of adding uniform noise per channel.
    pub noise_prob: f32,
    /// Max absolute noise added (0-1 range).
    pub noise_strength: f32,
    /// Probability of applying a blur.
    pub blur_prob: f32,
    /// Blur sigma (passed to image::imageops::blur).
    pub blur_sigma: f32,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            flip_horizontal_prob: 0.5,
            shift_fraction: 0.2,
            zoom_range: 0.2,
            rotation_degrees: 20.0,
            shear_degrees: 0.2,
            color_jitter_prob: 0.0,
            color_jitter_strength: 0.1,
            noise_prob: 0.0,
            noise_strength: 0.02,
            blur_prob: 0.0,
            blur_sigma: 1.0,
        }
    }
}

impl AugmentConfig {
    /// Identity pipeline.
    pub fn none() -> Self {
        Self {
            flip_horizontal_prob: 0.0,
            shift_fraction: 0.0,
            zoom_range: 0.0,
            rotation_degrees: 0.0,
            shear_degrees: 0.0,
            color_jitter_prob: 0.0,
            noise_prob: 0.0,
            blur_prob: 0.0,
            ..Self::default()
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "flip_p={:.2} shift={:.2} zoom={:.2} rotate={:.1}deg shear={:.2}deg color_jitter_p={:.2} strength={:.2} noise_p={:.2} strength={:.3} blur_p={:.2} sigma={:.2}",
            self.flip_horizontal_prob,
            self.shift_fraction,
            self.zoom_range,
            self.rotation_degrees,
            self.shear_degrees,
            self.color_jitter_prob,
            self.color_jitter_strength,
            self.noise_prob,
            self.noise_strength,
            self.blur_prob,
            self.blur_sigma,
        )
    }

    pub fn apply(&self, mut img: RgbImage, rng: &mut dyn rand::RngCore) -> RgbImage {
        maybe_hflip(&mut img, self.flip_horizontal_prob, rng);
        maybe_shift(&mut img, self.shift_fraction, rng);
        maybe_rotate(&mut img, self.rotation_degrees, rng);
        maybe_shear(&mut img, self.shear_degrees, rng);
        maybe_zoom(&mut img, self.zoom_range, rng);
        maybe_jitter(
            &mut img,
            self.color_jitter_prob,
            self.color_jitter_strength,
            rng,
        );
        maybe_noise(&mut img, self.noise_prob, self.noise_strength, rng);
        maybe_blur(&mut img, self.blur_prob, self.blur_sigma, rng);
        img
    }
}

pub(crate) fn maybe_hflip(img: &mut RgbImage, prob: f32, rng: &mut dyn rand::RngCore) {
    if prob <= 0.0 {
        return;
    }
    if rng.random_range(0.0..1.0) < prob {
        image::imageops::flip_horizontal_in_place(img);
    }
}

/// Translates the image, filling uncovered pixels from the nearest edge.
pub(crate) fn maybe_shift(img: &mut RgbImage, fraction: f32, rng: &mut dyn rand::RngCore) {
    if fraction <= 0.0 {
        return;
    }
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let dx = (rng.random_range(-fraction..fraction) * w as f32).round() as i64;
    let dy = (rng.random_range(-fraction..fraction) * h as f32).round() as i64;
    if dx == 0 && dy == 0 {
        return;
    }
    let src = img.clone();
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let sx = (x as i64 - dx).clamp(0, w as i64 - 1) as u32;
        let sy = (y as i64 - dy).clamp(0, h as i64 - 1) as u32;
        *pixel = *src.get_pixel(sx, sy);
    }
}

pub(crate) fn maybe_rotate(img: &mut RgbImage, max_degrees: f32, rng: &mut dyn rand::RngCore) {
    if max_degrees <= 0.0 {
        return;
    }
    let theta = rng.random_range(-max_degrees..max_degrees).to_radians();
    let (sin, cos) = theta.sin_cos();
    warp_about_center(img, [[cos, -sin], [sin, cos]]);
}

pub(crate) fn maybe_shear(img: &mut RgbImage, max_degrees: f32, rng: &mut dyn rand::RngCore) {
    if max_degrees <= 0.0 {
        return;
    }
    let shear = rng.random_range(-max_degrees..max_degrees).to_radians();
    warp_about_center(img, [[1.0, -shear.sin()], [0.0, shear.cos()]]);
}

/// Zooms each axis independently; zooming out fills from the nearest edge.
pub(crate) fn maybe_zoom(img: &mut RgbImage, range: f32, rng: &mut dyn rand::RngCore) {
    if range <= 0.0 {
        return;
    }
    let lo = (1.0 - range).max(0.05);
    let zx = rng.random_range(lo..(1.0 + range));
    let zy = rng.random_range(lo..(1.0 + range));
    warp_about_center(img, [[zx, 0.0], [0.0, zy]]);
}

/// Applies the linear map `forward` around the image center with
/// nearest-neighbour sampling; destination pixels whose source falls outside
/// the image take the closest edge pixel.
pub(crate) fn warp_about_center(img: &mut RgbImage, forward: [[f32; 2]; 2]) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let [[a, b], [c, d]] = forward;
    let det = a * d - b * c;
    if det.abs() < 1e-6 {
        return;
    }
    let inv = [[d / det, -b / det], [-c / det, a / det]];
    let (cx, cy) = ((w as f32 - 1.0) / 2.0, (h as f32 - 1.0) / 2.0);
    let src = img.clone();
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let (px, py) = (x as f32 - cx, y as f32 - cy);
        let sx = (cx + inv[0][0] * px + inv[0][1] * py).round();
        let sy = (cy + inv[1][0] * px + inv[1][1] * py).round();
        let sx = sx.clamp(0.0, (w - 1) as f32) as u32;
        let sy = sy.clamp(0.0, (h - 1) as f32) as u32;
        *pixel = *src.get_pixel(sx, sy);
    }
}

pub(crate) fn maybe_jitter(
    img: &mut RgbImage,
    prob: f32,
    strength: f32,
    rng: &mut dyn rand::RngCore,
) {
    if prob <= 0.0 || strength <= 0.0 {
        return;
    }
    if rng.random_range(0.0..1.0) >= prob {
        return;
    }
    let bright = 1.0 + rng.random_range(-strength..strength);
    let contrast = 1.0 + rng.random_range(-strength..strength);
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            let mut v = (v - 0.5) * contrast + 0.5;
            v *= bright;
            pixel[c] = (v.clamp(0.0, 1.0) * 255.0) as u8;
        }
    }
}

pub(crate) fn maybe_noise(
    img: &mut RgbImage,
    prob: f32,
    strength: f32,
    rng: &mut dyn rand::RngCore,
) {
    if prob <= 0.0 || strength <= 0.0 {
        return;
    }
    if rng.random_range(0.0..1.0) >= prob {
        return;
    }
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            let noise = rng.random_range(-strength..strength);
            let v = (pixel[c] as f32 / 255.0 + noise).clamp(0.0, 1.0);
            pixel[c] = (v * 255.0) as u8;
        }
    }
}

pub(crate) fn maybe_blur(img: &mut RgbImage, prob: f32, sigma: f32, rng: &mut dyn rand::RngCore) {
    if prob <= 0.0 || sigma <= 0.0 {
        return;
    }
    if rng.random_range(0.0..1.0) >= prob {
        return;
    }
    *img = image::imageops::blur(img, sigma);
}

#[cfg(test)]
mod aug_tests {
    use super::*;
    use image::Rgb;
    use rand::SeedableRng;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 0]))
    }

    #[test]
    fn hflip_mirrors_columns() {
        let mut img = gradient(4, 2);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        maybe_hflip(&mut img, 1.0, &mut rng);
        assert_eq!(img.get_pixel(0, 0)[0], 30);
        assert_eq!(img.get_pixel(3, 0)[0], 0);
    }

    #[test]
    fn identity_pipeline_keeps_pixels() {
        let img = gradient(8, 8);
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let out = AugmentConfig::none().apply(img.clone(), &mut rng);
        assert_eq!(out, img);
    }

    #[test]
    fn default_pipeline_keeps_dimensions() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let cfg = AugmentConfig {
            color_jitter_prob: 1.0,
            noise_prob: 1.0,
            blur_prob: 1.0,
            ..AugmentConfig::default()
        };
        for _ in 0..10 {
            let out = cfg.apply(gradient(20, 12), &mut rng);
            assert_eq!(out.dimensions(), (20, 12));
        }
    }

    #[test]
    fn half_turn_maps_corners_to_opposite_corners() {
        let src = gradient(5, 3);
        let mut img = src.clone();
        let (sin, cos) = std::f32::consts::PI.sin_cos();
        warp_about_center(&mut img, [[cos, -sin], [sin, cos]]);
        assert_eq!(img.get_pixel(0, 0), src.get_pixel(4, 2));
        assert_eq!(img.get_pixel(4, 2), src.get_pixel(0, 0));
        assert_eq!(img.get_pixel(2, 1), src.get_pixel(2, 1));
    }

    #[test]
    fn zoom_out_fills_from_nearest_edge() {
        let mut img = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgb([200, 0, 0])
            } else {
                Rgb([0, 0, 200])
            }
        });
        warp_about_center(&mut img, [[0.5, 0.0], [0.0, 0.5]]);
        assert!(img.pixels().all(|p| p.0 != [0, 0, 0]));
        assert_eq!(img.get_pixel(0, 0).0, [200, 0, 0]);
        assert_eq!(img.get_pixel(9, 9).0, [0, 0, 200]);
    }

    #[test]
    fn rotation_and_shear_keep_uniform_images() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let cfg = AugmentConfig {
            rotation_degrees: 20.0,
            shear_degrees: 20.0,
            zoom_range: 0.3,
            ..AugmentConfig::none()
        };
        let flat = RgbImage::from_pixel(17, 11, Rgb([90, 120, 30]));
        for _ in 0..5 {
            assert_eq!(cfg.apply(flat.clone(), &mut rng), flat);
        }
    }

    #[test]
    fn rotation_moves_off_center_pixels() {
        let src = gradient(16, 16);
        let mut img = src.clone();
        let (sin, cos) = 20f32.to_radians().sin_cos();
        warp_about_center(&mut img, [[cos, -sin], [sin, cos]]);
        assert_ne!(img, src);
        assert_eq!(img.dimensions(), (16, 16));
    }

    #[test]
    fn seeded_geometry_is_reproducible() {
        let cfg = AugmentConfig {
            rotation_degrees: 20.0,
            shear_degrees: 0.2,
            zoom_range: 0.2,
            ..AugmentConfig::none()
        };
        let a = cfg.apply(gradient(16, 16), &mut rand::rngs::StdRng::seed_from_u64(9));
        let b = cfg.apply(gradient(16, 16), &mut rand::rngs::StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_pipeline_is_reproducible() {
        let cfg = AugmentConfig::default();
        let a = cfg.apply(gradient(16, 16), &mut rand::rngs::StdRng::seed_from_u64(42));
        let b = cfg.apply(gradient(16, 16), &mut rand::rngs::StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
