//! Adherence history loading.
//!
//! Merges the live JSONL log with the CSV archive into the effective set
//! of records for a medication: one record per dose, latest mark wins.

use crate::adherence::latest_by_key;
use crate::archive::ArchiveRow;
use crate::{AdherenceRecord, Result};
use csv::ReaderBuilder;
use std::path::Path;
use uuid::Uuid;

/// Load the effective adherence records for one medication.
///
/// Archived records come first and live log records after them, so that
/// on equal timestamps the log entry wins.
pub fn load_records(
    log_path: &Path,
    csv_path: &Path,
    medication_id: Uuid,
) -> Result<Vec<AdherenceRecord>> {
    let mut records = Vec::new();

    if csv_path.exists() {
        let archived = load_records_from_csv(csv_path)?;
        let before = records.len();
        records.extend(archived.into_iter().filter(|r| r.medication_id == medication_id));
        tracing::debug!("Loaded {} archived records", records.len() - before);
    }

    if log_path.exists() {
        let live = crate::dose_log::read_records(log_path)?;
        let before = records.len();
        records.extend(live.into_iter().filter(|r| r.medication_id == medication_id));
        tracing::debug!("Loaded {} live records", records.len() - before);
    }

    let effective = latest_by_key(records);

    tracing::info!(
        "Loaded {} adherence records for {}",
        effective.len(),
        medication_id
    );

    Ok(effective)
}

/// Load every record from the CSV archive, skipping bad rows
fn load_records_from_csv(path: &Path) -> Result<Vec<AdherenceRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut records = Vec::new();
    for result in reader.deserialize::<ArchiveRow>() {
        match result {
            Ok(row) => match AdherenceRecord::try_from(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Failed to parse archived record: {}", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize archive row: {}", e);
            }
        }
    }

    Ok(records)
}
