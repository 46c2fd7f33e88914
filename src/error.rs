//! Error types for breakpoint configuration and row decoding.

use thiserror::Error;

use crate::pollutant::Pollutant;

/// Errors raised when a breakpoint table or a reading cannot be used.
///
/// Out-of-range concentrations are not errors; they surface as `None`
/// from the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A column or table key does not name a known pollutant
    #[error("Unknown pollutant: {0}")]
    UnknownPollutant(String),

    /// A breakpoint table breaks the ordering or range invariants
    #[error("Invalid breakpoint table for {pollutant} at index {index}: {reason}")]
    InvalidTable {
        pollutant: Pollutant,
        index: usize,
        reason: String,
    },

    /// A breakpoint table has no entries
    #[error("Breakpoint table for {0} is empty")]
    EmptyTable(Pollutant),

    /// The same pollutant was given two tables
    #[error("Duplicate breakpoint table for {0}")]
    DuplicateTable(Pollutant),

    /// Breakpoint configuration could not be parsed
    #[error("Failed to parse breakpoint configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A timestamp cell could not be parsed
    #[error("Failed to parse timestamp: {0}")]
    TimestampParse(String),

    /// A concentration cell is not a number
    #[error("Invalid value for {column}: {value}")]
    InvalidValue { column: String, value: String },

    /// The input has no timestamp column
    #[error("Missing timestamp column")]
    MissingTimestamp,
}

pub type Result<T> = std::result::Result<T, EngineError>;
