//! Adherence calculation.
//!
//! Cross-references logged [`AdherenceRecord`]s against a generated
//! schedule. Records are matched to doses by `(date, time_of_day)`; a
//! record that matches no scheduled dose never counts.

use crate::{AdherenceRecord, AdherenceSummary, DailyAdherence, DoseEvent};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// Percentage of `taken` over `total`, rounded to two decimals.
///
/// Zero when there is nothing scheduled.
pub fn round_percentage(taken: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = taken as f64 / total as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

/// Collapse records to one per `(medication, date, time_of_day)`.
///
/// The record with the latest `recorded_at` wins; on a tie the one that
/// appears later in `records` wins. Output keeps first-seen key order.
pub fn latest_by_key(records: impl IntoIterator<Item = AdherenceRecord>) -> Vec<AdherenceRecord> {
    let mut index: HashMap<(Uuid, DoseEvent), usize> = HashMap::new();
    let mut out: Vec<AdherenceRecord> = Vec::new();

    for record in records {
        let key = (record.medication_id, record.dose());
        match index.get(&key) {
            Some(&i) => {
                if record.recorded_at >= out[i].recorded_at {
                    out[i] = record;
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(record);
            }
        }
    }

    out
}

/// Doses of `medication_id` whose effective record says taken
fn taken_doses(medication_id: Uuid, records: &[AdherenceRecord]) -> HashSet<DoseEvent> {
    let own = records
        .iter()
        .filter(|r| r.medication_id == medication_id)
        .cloned();

    latest_by_key(own)
        .into_iter()
        .filter(AdherenceRecord::is_taken)
        .map(|r| r.dose())
        .collect()
}

/// Summarize adherence for one medication over its schedule.
///
/// Records for other medications, records not marked taken, and records
/// for doses outside `events` are ignored.
pub fn summarize(
    medication_id: Uuid,
    events: impl IntoIterator<Item = DoseEvent>,
    records: &[AdherenceRecord],
) -> AdherenceSummary {
    let taken = taken_doses(medication_id, records);

    let mut total_doses = 0;
    let mut taken_count = 0;
    for event in events {
        total_doses += 1;
        if taken.contains(&event) {
            taken_count += 1;
        }
    }

    let summary = AdherenceSummary {
        medication_id,
        total_doses,
        taken_count,
        adherence_percentage: round_percentage(taken_count, total_doses),
    };

    tracing::debug!(
        "Adherence for {}: {}/{} ({}%)",
        medication_id,
        taken_count,
        total_doses,
        summary.adherence_percentage
    );

    summary
}

/// Per-day adherence, one entry per scheduled day in date order
pub fn daily_breakdown(
    medication_id: Uuid,
    events: impl IntoIterator<Item = DoseEvent>,
    records: &[AdherenceRecord],
) -> Vec<DailyAdherence> {
    let taken = taken_doses(medication_id, records);

    let mut days: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for event in events {
        let entry = days.entry(event.date).or_default();
        entry.0 += 1;
        if taken.contains(&event) {
            entry.1 += 1;
        }
    }

    days.into_iter()
        .map(|(date, (scheduled, taken))| DailyAdherence {
            date,
            scheduled,
            taken,
            adherence_percentage: round_percentage(taken, scheduled),
        })
        .collect()
}
