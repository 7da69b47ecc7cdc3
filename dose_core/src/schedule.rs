//! Dose schedule generation.
//!
//! Expands a [`MedicationPlan`] into the sequence of [`DoseEvent`]s it
//! calls for. The current date is always passed in by the caller; nothing
//! here reads the clock, so the same plan and `today` always produce the
//! same schedule.

use crate::{DoseEvent, Frequency, MedicationPlan, TimeOfDay};
use chrono::NaiveDate;
use std::iter::FusedIterator;

/// Lazy iterator over a plan's dose events.
///
/// Walks every day from the plan's start through its end (or `today` for
/// open-ended plans), emitting one event per distinct time of day on each
/// day the frequency includes. Clone it or call [`DoseSchedule::rewind`]
/// to walk the same schedule again.
#[derive(Clone, Debug)]
pub struct DoseSchedule {
    frequency: Frequency,
    start: NaiveDate,
    end: NaiveDate,
    times: Vec<TimeOfDay>,
    cursor: Option<NaiveDate>,
    slot: usize,
}

impl DoseSchedule {
    fn new(frequency: Frequency, start: NaiveDate, end: NaiveDate, times: Vec<TimeOfDay>) -> Self {
        let mut schedule = Self {
            frequency,
            start,
            end,
            times,
            cursor: None,
            slot: 0,
        };
        schedule.rewind();
        schedule
    }

    /// Reset to the first day of the range
    pub fn rewind(&mut self) {
        let empty = self.times.is_empty()
            || self.frequency == Frequency::AsNeeded
            || self.start > self.end;
        self.cursor = if empty { None } else { Some(self.start) };
        self.slot = 0;
    }

    /// First and last day covered, inclusive
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end)
    }
}

impl Iterator for DoseSchedule {
    type Item = DoseEvent;

    fn next(&mut self) -> Option<DoseEvent> {
        loop {
            let day = self.cursor?;
            if day > self.end {
                self.cursor = None;
                return None;
            }

            if self.slot < self.times.len() && self.frequency.includes(self.start, day) {
                let event = DoseEvent::new(day, self.times[self.slot]);
                self.slot += 1;
                return Some(event);
            }

            self.slot = 0;
            self.cursor = day.succ_opt();
        }
    }
}

impl FusedIterator for DoseSchedule {}

/// Generate the dose schedule for a plan.
///
/// Open-ended plans run through `today`. Plans with no times of day, an
/// end date before the start date, or an `as needed` frequency produce an
/// empty schedule rather than an error.
pub fn generate_schedule(plan: &MedicationPlan, today: NaiveDate) -> DoseSchedule {
    let end = plan.effective_end(today);
    let schedule = DoseSchedule::new(plan.frequency, plan.start_date, end, plan.distinct_times());

    tracing::debug!(
        "Schedule for {} ({}): {} to {}",
        plan.medication,
        plan.frequency,
        plan.start_date,
        end
    );

    schedule
}

/// Doses a plan calls for on a single day.
///
/// Empty when `date` falls outside the plan's range. For open-ended plans
/// `date` itself is treated as today.
pub fn doses_on(plan: &MedicationPlan, date: NaiveDate) -> Vec<DoseEvent> {
    let end = plan.effective_end(date);
    if date < plan.start_date || date > end {
        return Vec::new();
    }
    if !plan.frequency.includes(plan.start_date, date) {
        return Vec::new();
    }

    plan.distinct_times()
        .into_iter()
        .map(|t| DoseEvent::new(date, t))
        .collect()
}
