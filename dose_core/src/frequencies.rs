//! Frequency catalogue for plan entry forms.
//!
//! The `(value, label)` pairs a client shows in its frequency picker,
//! in the order they should appear.

use crate::Frequency;
use once_cell::sync::Lazy;
use serde::Serialize;

/// One entry of the frequency picker
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct FrequencyOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Built once from [`Frequency::ALL`]
static FREQUENCY_OPTIONS: Lazy<Vec<FrequencyOption>> = Lazy::new(|| {
    Frequency::ALL
        .iter()
        .map(|f| FrequencyOption {
            value: f.as_str(),
            label: f.label(),
        })
        .collect()
});

pub fn frequency_options() -> &'static [FrequencyOption] {
    &FREQUENCY_OPTIONS
}
