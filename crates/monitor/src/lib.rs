//! Periodic sample-classify-debounce monitoring over an owned camera.

pub mod clock;
pub mod config;
pub mod debounce;
pub mod display;
pub mod runner;
pub mod session;

use std::io;
use thiserror::Error;
use vision_core::interfaces::ClassifierError;

pub use clock::{CancelToken, Clock, ManualClock, SystemClock};
pub use config::{MonitorConfig, ReadFailurePolicy};
pub use debounce::{DebounceRule, DebounceState, DebounceUpdate};
pub use display::{Display, HeadlessDisplay, TerminalDisplay};
#[cfg(feature = "opencv")]
pub use display::WindowDisplay;
pub use runner::{DebouncedClassificationLoop, EndReason, LoopState, SampleOutcome, SessionSummary};
pub use session::MonitorSession;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Acquire(#[from] capture::AcquireError),
    #[error("classifier failure on sample {sample_index}: {source}")]
    Classifier {
        sample_index: u64,
        #[source]
        source: ClassifierError,
    },
    #[error("display error: {0}")]
    Display(#[source] io::Error),
    #[error("invalid monitor config: {0}")]
    Config(String),
}
