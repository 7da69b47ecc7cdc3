//! Append-only adherence log.
//!
//! Every "taken" or "skipped" mark is appended to a JSONL (JSON Lines)
//! file under an exclusive file lock. Corrections are new lines, never
//! in-place edits; readers collapse duplicates with
//! [`latest_by_key`](crate::adherence::latest_by_key).

use crate::{AdherenceRecord, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for adherence records
pub trait RecordSink {
    fn append(&mut self, record: &AdherenceRecord) -> Result<()>;
}

/// JSONL-based record sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl RecordSink for JsonlSink {
    fn append(&mut self, record: &AdherenceRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // One write per record so concurrent appenders never interleave
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!(
            "Logged {} {} for {} (taken: {:?})",
            record.date,
            record.time_of_day,
            record.medication_id,
            record.taken
        );
        Ok(())
    }
}

/// Read every record from a log file, in file order.
///
/// A missing file is an empty log. Lines that fail to parse (including a
/// torn final line) are skipped with a warning.
pub fn read_records(path: &Path) -> Result<Vec<AdherenceRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;
    let records = parse_records(&file, path)?;
    file.unlock()?;

    tracing::debug!("Read {} adherence records from {:?}", records.len(), path);
    Ok(records)
}

/// Parse an already-locked log from its current position
pub(crate) fn parse_records(file: &File, path: &Path) -> Result<Vec<AdherenceRecord>> {
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<AdherenceRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable adherence record at {:?} line {}: {}",
                    path,
                    line_num + 1,
                    e
                );
            }
        }
    }

    Ok(records)
}
