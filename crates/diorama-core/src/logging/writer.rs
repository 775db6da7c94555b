//! Append-only JSONL writer for run logs.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::entry::{LogRecord, RunMetadata};

/// Writes the records of one run to `logs/raw/<date>_<run>.jsonl`.
pub struct RunLogWriter {
    run: String,
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl RunLogWriter {
    /// Open (or create) the log file for `run`, creating `raw/` as needed.
    pub fn new(logs_dir: impl AsRef<Path>, run: impl Into<String>) -> std::io::Result<Self> {
        let run = run.into();
        let raw_dir = logs_dir.as_ref().join("raw");
        fs::create_dir_all(&raw_dir)?;

        let date = chrono::Local::now().format("%Y-%m-%d");
        let path = raw_dir.join(format!("{}_{}.jsonl", date, run));

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            run,
            writer: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    pub fn run(&self) -> &str {
        &self.run
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    pub fn write(&self, record: &LogRecord) -> std::io::Result<()> {
        let line = record
            .to_json_line()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()
    }

    pub fn flush(&self) -> std::io::Result<()> {
        self.writer.lock().flush()
    }
}

impl Drop for RunLogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Write run metadata to `logs/sessions/<run>.json`.
pub fn write_run_metadata(logs_dir: impl AsRef<Path>, metadata: &RunMetadata) -> std::io::Result<PathBuf> {
    let sessions_dir = logs_dir.as_ref().join("sessions");
    fs::create_dir_all(&sessions_dir)?;

    let path = sessions_dir.join(format!("{}.json", metadata.run_id));
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(&path, json)?;

    Ok(path)
}

/// Read every record of one run, in file order.
///
/// Lines that fail to parse are skipped with a warning.
pub fn read_run_records(logs_dir: impl AsRef<Path>, run: &str) -> std::io::Result<Vec<LogRecord>> {
    let raw_dir = logs_dir.as_ref().join("raw");
    if !raw_dir.exists() {
        return Ok(Vec::new());
    }

    let suffix = format!("_{}.jsonl", run);
    let mut records = Vec::new();

    for dir_entry in fs::read_dir(&raw_dir)? {
        let path = dir_entry?.path();
        let matches = path
            .file_name()
            .and_then(|f| f.to_str())
            .map(|f| f.ends_with(&suffix))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        for line in fs::read_to_string(&path)?.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match LogRecord::from_json_line(line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping malformed log line"),
            }
        }
    }

    Ok(records)
}
