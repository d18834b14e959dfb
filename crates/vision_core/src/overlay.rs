use image::{Rgb, RgbImage};

pub const NORMAL_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
pub const ABNORMAL_COLOR: Rgb<u8> = Rgb([255, 165, 0]);
pub const ALERT_COLOR: Rgb<u8> = Rgb([230, 0, 0]);

/// What the live view shows for the most recent classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStatus {
    pub abnormal: bool,
    pub confidence: f32,
    pub alert: bool,
}

impl OverlayStatus {
    pub fn color(&self) -> Rgb<u8> {
        if self.alert {
            ALERT_COLOR
        } else if self.abnormal {
            ABNORMAL_COLOR
        } else {
            NORMAL_COLOR
        }
    }
}

/// Draw a rectangle border with given thickness.
pub fn draw_rect(img: &mut RgbImage, bbox_px: [u32; 4], color: Rgb<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    let [x0, y0, x1, y1] = bbox_px;
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 >= w || yy0 >= h || xx1 >= w || yy1 >= h || xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

/// Fill an axis-aligned rectangle, clipped to the image.
pub fn fill_rect(img: &mut RgbImage, bbox_px: [u32; 4], color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let [x0, y0, x1, y1] = bbox_px;
    for y in y0..=y1.min(h.saturating_sub(1)) {
        for x in x0..=x1.min(w.saturating_sub(1)) {
            img.put_pixel(x, y, color);
        }
    }
}

/// Annotates a live-view frame: colored border, a confidence bar along the
/// bottom edge, and a solid banner across the top while alerting.
pub fn annotate(img: &mut RgbImage, status: &OverlayStatus) {
    let (w, h) = img.dimensions();
    if w < 8 || h < 8 {
        return;
    }
    let color = status.color();
    let thickness = (w.min(h) / 60).max(2);
    draw_rect(img, [0, 0, w - 1, h - 1], color, thickness);

    let bar_h = thickness * 2;
    let inner = w - 2 * thickness;
    let filled = ((status.confidence.clamp(0.0, 1.0)) * inner as f32).round() as u32;
    if filled > 0 {
        let y1 = h - 1 - thickness;
        fill_rect(
            img,
            [thickness, y1 + 1 - bar_h, thickness + filled - 1, y1],
            color,
        );
    }

    if status.alert {
        fill_rect(img, [thickness, thickness, w - 1 - thickness, h / 10], color);
    }
}
