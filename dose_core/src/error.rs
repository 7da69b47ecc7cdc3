//! Error types for the dose_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dose_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or contradictory plan input (unknown frequency or
    /// time of day, empty times, inverted date range)
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// No plan with this id (or id prefix) exists in the store
    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn plan_not_found(id: &Uuid) -> Self {
        Error::PlanNotFound(id.to_string())
    }
}
