//! vision_core: frame, prediction and capability interfaces shared by
//! training, inference and the monitoring loop.

pub mod interfaces;
pub mod overlay;
pub mod preprocess;
pub mod segment;

pub mod prelude {
    pub use crate::interfaces::*;
    pub use crate::overlay::{annotate, OverlayStatus};
    pub use crate::preprocess::{apply_mask, frame_to_input, resize_square, to_chw};
    pub use crate::segment::BackgroundReference;
}
