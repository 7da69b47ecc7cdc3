//! CSV archive for the adherence log.
//!
//! Rolls the JSONL log into an append-only CSV file and empties the log,
//! so the live log stays short.

use crate::{AdherenceRecord, Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// One archived record. Column order is the CSV header order.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ArchiveRow {
    medication_id: String,
    date: String,
    time_of_day: String,
    taken: Option<bool>,
    note: Option<String>,
    recorded_at: String,
}

impl From<&AdherenceRecord> for ArchiveRow {
    fn from(record: &AdherenceRecord) -> Self {
        ArchiveRow {
            medication_id: record.medication_id.to_string(),
            date: record.date.format("%Y-%m-%d").to_string(),
            time_of_day: record.time_of_day.to_string(),
            taken: record.taken,
            note: record.note.clone(),
            recorded_at: record.recorded_at.to_rfc3339(),
        }
    }
}

impl TryFrom<ArchiveRow> for AdherenceRecord {
    type Error = Error;

    fn try_from(row: ArchiveRow) -> Result<Self> {
        let medication_id = Uuid::parse_str(&row.medication_id)
            .map_err(|e| Error::Other(format!("Invalid medication id: {}", e)))?;

        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .map_err(|e| Error::Other(format!("Invalid date '{}': {}", row.date, e)))?;

        let recorded_at = DateTime::parse_from_rfc3339(&row.recorded_at)
            .map_err(|e| Error::Other(format!("Invalid timestamp '{}': {}", row.recorded_at, e)))?
            .with_timezone(&Utc);

        Ok(AdherenceRecord {
            medication_id,
            date,
            time_of_day: row.time_of_day.parse()?,
            taken: row.taken,
            note: row.note.filter(|n| !n.is_empty()),
            recorded_at,
        })
    }
}

/// Roll the log into the CSV archive, then empty the log.
///
/// Holds an exclusive lock on the log throughout, so appends made while
/// the rollup runs wait and land in the emptied log rather than being
/// lost:
/// 1. Reads all records from the log
/// 2. Appends them to the CSV (writing headers only for a new file)
/// 3. Syncs the CSV to disk
/// 4. Copies the log to `<name>.jsonl.<timestamp>.processed`
/// 5. Truncates the log
///
/// The processed copy allows recovery by hand until
/// [`cleanup_processed_logs`] runs. Returns the number of records archived.
pub fn log_to_csv_and_archive(log_path: &Path, csv_path: &Path) -> Result<usize> {
    if !log_path.exists() {
        return Ok(0);
    }

    let log = OpenOptions::new().read(true).write(true).open(log_path)?;
    log.lock_exclusive()?;

    let records = crate::dose_log::parse_records(&log, log_path)?;

    if records.is_empty() {
        log.unlock()?;
        tracing::info!("No adherence records in log to archive");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for record in &records {
        writer.serialize(ArchiveRow::from(record))?;
    }

    writer.flush()?;
    let file = writer.into_inner().map_err(std::io::Error::other)?;
    file.sync_all()?;

    tracing::info!("Archived {} adherence records to {:?}", records.len(), csv_path);

    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f");
    let processed_path = log_path.with_extension(format!("jsonl.{}.processed", stamp));
    std::fs::copy(log_path, &processed_path)?;

    log.set_len(0)?;
    log.sync_all()?;
    log.unlock()?;

    tracing::info!("Kept processed log as {:?}", processed_path);

    Ok(records.len())
}

/// Remove every `*.processed` log in `dir`
pub fn cleanup_processed_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed log: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed logs", count);
    }

    Ok(count)
}
