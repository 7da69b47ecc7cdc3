//! Core domain types for the DrugVision dosing system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Dosing frequencies and time-of-day slots
//! - Medication plans and their lifecycle status
//! - Dose events derived from a plan
//! - Adherence records and the summaries computed from them

use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Time of Day
// ============================================================================

/// A dosing slot within a day
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            "night" => Ok(TimeOfDay::Night),
            other => Err(Error::InvalidPlan(format!(
                "unknown time of day '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Frequency
// ============================================================================

/// How often a medication is taken.
///
/// Serialized with the exact strings the medication API accepts
/// (`"once a day"`, `"alternate days"`, ...).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Frequency {
    #[serde(rename = "once a day")]
    OnceADay,
    #[serde(rename = "twice a day")]
    TwiceADay,
    #[serde(rename = "everyday")]
    Everyday,
    #[serde(rename = "alternate days")]
    AlternateDays,
    #[serde(rename = "once a week")]
    OnceAWeek,
    #[serde(rename = "as needed")]
    AsNeeded,
}

impl Frequency {
    pub const ALL: [Frequency; 6] = [
        Frequency::OnceADay,
        Frequency::TwiceADay,
        Frequency::Everyday,
        Frequency::AlternateDays,
        Frequency::OnceAWeek,
        Frequency::AsNeeded,
    ];

    /// Wire value of this frequency
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::OnceADay => "once a day",
            Frequency::TwiceADay => "twice a day",
            Frequency::Everyday => "everyday",
            Frequency::AlternateDays => "alternate days",
            Frequency::OnceAWeek => "once a week",
            Frequency::AsNeeded => "as needed",
        }
    }

    /// Human-readable label for pickers
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::OnceADay => "Once a Day",
            Frequency::TwiceADay => "Twice a Day",
            Frequency::Everyday => "Everyday",
            Frequency::AlternateDays => "Alternate Days",
            Frequency::OnceAWeek => "Once a Week",
            Frequency::AsNeeded => "As Needed",
        }
    }

    /// Whether doses fall on `day` for a plan that started on `start`.
    ///
    /// - Daily variants: every day
    /// - Alternate days: days whose day-of-month is even
    /// - Once a week: same weekday as `start`
    /// - As needed: never
    ///
    /// `twice a day` does not double anything here; the number of doses
    /// per day comes from the plan's times of day.
    pub fn includes(&self, start: NaiveDate, day: NaiveDate) -> bool {
        match self {
            Frequency::OnceADay | Frequency::TwiceADay | Frequency::Everyday => true,
            Frequency::AlternateDays => day.day() % 2 == 0,
            Frequency::OnceAWeek => day.weekday() == start.weekday(),
            Frequency::AsNeeded => false,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    /// Accepts the wire value case-insensitively, with `_` or `-` in
    /// place of spaces (`once_a_day`, `as-needed`).
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        Frequency::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| Error::InvalidPlan(format!("unknown frequency '{}'", s.trim())))
    }
}

// ============================================================================
// Medication Plan
// ============================================================================

/// Lifecycle status of a prescription
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MedicationStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for MedicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MedicationStatus::Active => "active",
            MedicationStatus::Completed => "completed",
            MedicationStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for MedicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(MedicationStatus::Active),
            "completed" => Ok(MedicationStatus::Completed),
            "cancelled" | "canceled" => Ok(MedicationStatus::Cancelled),
            other => Err(Error::InvalidPlan(format!("unknown status '{}'", other))),
        }
    }
}

/// A prescription's dosing configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MedicationPlan {
    pub id: Uuid,
    pub medication: String,
    /// Names of the drugs the medication contains
    #[serde(default)]
    pub drugs: Vec<String>,
    pub dosage: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub times_of_day: Vec<TimeOfDay>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: MedicationStatus,
    #[serde(default)]
    pub prescribed_by: Option<String>,
    #[serde(default)]
    pub patient: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MedicationPlan {
    /// Create an active, open-ended plan with a fresh id.
    ///
    /// Duplicate times of day are dropped, keeping the first occurrence.
    pub fn new(
        medication: impl Into<String>,
        dosage: impl Into<String>,
        frequency: Frequency,
        times_of_day: Vec<TimeOfDay>,
        start_date: NaiveDate,
    ) -> Self {
        let mut plan = Self {
            id: Uuid::new_v4(),
            medication: medication.into(),
            drugs: Vec::new(),
            dosage: dosage.into(),
            frequency,
            times_of_day: Vec::new(),
            start_date,
            end_date: None,
            status: MedicationStatus::Active,
            prescribed_by: None,
            patient: None,
            notes: None,
            created_at: Utc::now(),
        };
        plan.times_of_day = dedup_times(&times_of_day);
        plan
    }

    pub fn with_drugs<I, S>(mut self, drugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drugs = drugs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Times of day with duplicates removed, in declared order
    pub fn distinct_times(&self) -> Vec<TimeOfDay> {
        dedup_times(&self.times_of_day)
    }

    /// Last day of the plan; open-ended plans run through `today`
    pub fn effective_end(&self, today: NaiveDate) -> NaiveDate {
        self.end_date.unwrap_or(today)
    }

    /// Reject plans that can never produce a dose.
    ///
    /// Schedule generation itself tolerates these and yields nothing;
    /// this is for callers that want to refuse them at creation.
    pub fn validate(&self) -> Result<()> {
        if self.medication.trim().is_empty() {
            return Err(Error::InvalidPlan("medication name is empty".into()));
        }
        if self.dosage.trim().is_empty() {
            return Err(Error::InvalidPlan("dosage is empty".into()));
        }
        if self.drugs.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::InvalidPlan("drug names must not be empty".into()));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(Error::InvalidPlan(format!(
                    "end date {} is before start date {}",
                    end, self.start_date
                )));
            }
        }
        if self.times_of_day.is_empty() && self.frequency != Frequency::AsNeeded {
            return Err(Error::InvalidPlan(format!(
                "'{}' needs at least one time of day",
                self.frequency
            )));
        }
        Ok(())
    }
}

fn dedup_times(times: &[TimeOfDay]) -> Vec<TimeOfDay> {
    let mut out = Vec::with_capacity(times.len());
    for t in times {
        if !out.contains(t) {
            out.push(*t);
        }
    }
    out
}

// ============================================================================
// Dose Events and Adherence
// ============================================================================

/// One expected dose. Also the key adherence records are matched on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoseEvent {
    pub date: NaiveDate,
    pub time_of_day: TimeOfDay,
}

impl DoseEvent {
    pub fn new(date: NaiveDate, time_of_day: TimeOfDay) -> Self {
        Self { date, time_of_day }
    }
}

/// A logged observation of whether a dose was taken.
///
/// `taken` is `None` while the dose has not been marked either way.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdherenceRecord {
    pub medication_id: Uuid,
    pub date: NaiveDate,
    pub time_of_day: TimeOfDay,
    #[serde(default)]
    pub taken: Option<bool>,
    #[serde(default)]
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AdherenceRecord {
    pub fn new(medication_id: Uuid, dose: DoseEvent, taken: Option<bool>) -> Self {
        Self {
            medication_id,
            date: dose.date,
            time_of_day: dose.time_of_day,
            taken,
            note: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The dose this record refers to
    pub fn dose(&self) -> DoseEvent {
        DoseEvent::new(self.date, self.time_of_day)
    }

    pub fn is_taken(&self) -> bool {
        self.taken == Some(true)
    }
}

/// Aggregate adherence over a plan's schedule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdherenceSummary {
    pub medication_id: Uuid,
    pub total_doses: usize,
    pub taken_count: usize,
    pub adherence_percentage: f64,
}

/// Adherence for a single scheduled day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DailyAdherence {
    pub date: NaiveDate,
    pub scheduled: usize,
    pub taken: usize,
    pub adherence_percentage: f64,
}
