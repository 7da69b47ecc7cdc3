#![forbid(unsafe_code)]

//! Core domain model and business logic for DrugVision medication tracking.
//!
//! This crate provides:
//! - Domain types (plans, frequencies, dose events, adherence records)
//! - Dose schedule generation
//! - Adherence calculation
//! - Persistence (plan store, adherence log, CSV archive)
//! - Configuration and logging

pub mod types;
pub mod error;
pub mod frequencies;
pub mod config;
pub mod logging;
pub mod schedule;
pub mod adherence;
pub mod plans;
pub mod dose_log;
pub mod archive;
pub mod history;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use frequencies::{frequency_options, FrequencyOption};
pub use schedule::{doses_on, generate_schedule, DoseSchedule};
pub use adherence::{daily_breakdown, summarize};
pub use plans::PlanStore;
pub use dose_log::{JsonlSink, RecordSink};
pub use history::load_records;
