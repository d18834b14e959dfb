//! Live-view surfaces and the user's quit signal.

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode, ClearType};
use crossterm::{cursor, execute, style::Print};
use std::io::{self, Write};
use std::time::Duration;
use vision_core::interfaces::Frame;

use crate::runner::SampleOutcome;

/// Presents each polled frame with the latest classification and reports
/// whether the user asked to quit.
pub trait Display {
    fn show(&mut self, frame: &Frame, latest: Option<&SampleOutcome>) -> io::Result<()>;
    /// Polled once per tick; must not block.
    fn quit_requested(&mut self) -> bool;
}

impl<D: Display + ?Sized> Display for Box<D> {
    fn show(&mut self, frame: &Frame, latest: Option<&SampleOutcome>) -> io::Result<()> {
        (**self).show(frame, latest)
    }

    fn quit_requested(&mut self) -> bool {
        (**self).quit_requested()
    }
}

/// No surface; logs when the displayed status changes.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    last: Option<(u64, bool)>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame, latest: Option<&SampleOutcome>) -> io::Result<()> {
        let Some(outcome) = latest else {
            return Ok(());
        };
        let key = (outcome.sample_index, outcome.alert);
        if self.last != Some(key) {
            if self.last.map(|(_, alert)| alert) != Some(outcome.alert) {
                tracing::info!(
                    alert = outcome.alert,
                    label = %outcome.prediction.label(),
                    "posture status changed"
                );
            }
            self.last = Some(key);
        }
        Ok(())
    }

    fn quit_requested(&mut self) -> bool {
        false
    }
}

/// One-line status in the terminal; `q`, Esc or Ctrl-C quits. Raw mode is
/// enabled for the display's lifetime.
pub struct TerminalDisplay {
    out: io::Stdout,
    raw: bool,
}

impl TerminalDisplay {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self {
            out: io::stdout(),
            raw: true,
        })
    }

    fn status_line(latest: Option<&SampleOutcome>) -> String {
        match latest {
            None => "waiting for first sample   (q to quit)".to_string(),
            Some(o) => format!(
                "{}{} {:>5.1}%  streak {}  sample #{}   (q to quit)",
                if o.alert { "ALERT: " } else { "" },
                o.prediction.label(),
                o.prediction.confidence * 100.0,
                o.streak,
                o.sample_index
            ),
        }
    }
}

impl Display for TerminalDisplay {
    fn show(&mut self, _frame: &Frame, latest: Option<&SampleOutcome>) -> io::Result<()> {
        execute!(
            self.out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print(Self::status_line(latest))
        )?;
        self.out.flush()
    }

    fn quit_requested(&mut self) -> bool {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(err) => {
                    tracing::warn!(%err, "terminal event poll failed");
                    return false;
                }
            }
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let quit = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
            if quit {
                return true;
            }
        }
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        if self.raw {
            let _ = disable_raw_mode();
            let _ = execute!(self.out, Print("\r\n"));
            self.raw = false;
        }
    }
}

#[cfg(feature = "opencv")]
pub use window::WindowDisplay;

#[cfg(feature = "opencv")]
mod window {
    use super::Display;
    use crate::runner::SampleOutcome;
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::{highgui, imgproc};
    use std::io;
    use vision_core::interfaces::Frame;
    use vision_core::overlay::{annotate, OverlayStatus};

    const QUIT_KEYS: [i32; 2] = ['q' as i32, 27];

    /// OpenCV highgui window with the status overlay drawn on each frame.
    pub struct WindowDisplay {
        name: String,
        quit: bool,
    }

    impl WindowDisplay {
        pub fn new(name: impl Into<String>) -> io::Result<Self> {
            let name = name.into();
            highgui::named_window(&name, highgui::WINDOW_AUTOSIZE).map_err(io::Error::other)?;
            Ok(Self { name, quit: false })
        }
    }

    impl Display for WindowDisplay {
        fn show(&mut self, frame: &Frame, latest: Option<&SampleOutcome>) -> io::Result<()> {
            let mut img = frame.image.clone();
            if let Some(o) = latest {
                annotate(
                    &mut img,
                    &OverlayStatus {
                        abnormal: o.prediction.abnormal,
                        confidence: o.prediction.confidence,
                        alert: o.alert,
                    },
                );
            }
            let (_, height) = img.dimensions();
            let flat = Mat::from_slice(img.as_raw()).map_err(io::Error::other)?;
            let rgb = flat.reshape(3, height as i32).map_err(io::Error::other)?;
            let mut bgr = Mat::default();
            imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)
                .map_err(io::Error::other)?;
            highgui::imshow(&self.name, &bgr).map_err(io::Error::other)?;
            let key = highgui::wait_key(1).map_err(io::Error::other)?;
            if QUIT_KEYS.contains(&key) {
                self.quit = true;
            }
            Ok(())
        }

        fn quit_requested(&mut self) -> bool {
            self.quit
        }
    }

    impl Drop for WindowDisplay {
        fn drop(&mut self) {
            let _ = highgui::destroy_window(&self.name);
        }
    }
}
