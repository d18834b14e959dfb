use data_contracts::SampleRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use vision_core::interfaces::{Frame, DECISION_THRESHOLD};

/// Sink for classified samples.
pub trait SampleRecorder {
    /// `frame` is the image that was classified, for recorders that keep it.
    fn record(&mut self, record: &SampleRecord, frame: Option<&Frame>) -> std::io::Result<()>;
}

/// Appends one JSON line per sample to `run_dir/samples.jsonl`; optionally
/// saves each sampled frame to `run_dir/images/sample_XXXXX.png`.
pub struct JsonlRecorder {
    run_dir: PathBuf,
    writer: BufWriter<File>,
    save_frames: bool,
    threshold: f32,
}

impl JsonlRecorder {
    pub fn create(run_dir: impl Into<PathBuf>, save_frames: bool) -> std::io::Result<Self> {
        let run_dir = run_dir.into();
        fs::create_dir_all(&run_dir)?;
        if save_frames {
            fs::create_dir_all(run_dir.join("images"))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(Self::log_path_in(&run_dir))?;
        Ok(Self {
            run_dir,
            writer: BufWriter::new(file),
            save_frames,
            threshold: DECISION_THRESHOLD,
        })
    }

    /// Decision threshold the records are validated against.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn log_path(&self) -> PathBuf {
        Self::log_path_in(&self.run_dir)
    }

    fn log_path_in(run_dir: &Path) -> PathBuf {
        run_dir.join("samples.jsonl")
    }
}

impl SampleRecorder for JsonlRecorder {
    fn record(&mut self, record: &SampleRecord, frame: Option<&Frame>) -> std::io::Result<()> {
        let mut record = record.clone();
        if let (true, Some(frame)) = (self.save_frames, frame) {
            let rel = format!("images/sample_{:05}.png", record.sample_index);
            frame
                .image
                .save(self.run_dir.join(&rel))
                .map_err(std::io::Error::other)?;
            record.image = Some(rel);
        }
        record
            .validate(self.threshold)
            .map_err(|e| std::io::Error::other(format!("validation failed: {e}")))?;
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}
