//! Core error types for healthpulse-core.
//!
//! This module defines the error hierarchy using thiserror. Pure
//! computations (streaks, achievements) never fail; errors come from
//! configuration, data sources and timer registration.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for healthpulse-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reminder scheduling errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Record/stats/medication source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Errors raised while registering reminder timers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// No async runtime is available to host the timer task
    #[error("No async runtime available to host reminder timers")]
    NoRuntime,

    /// The pending-timer ceiling was reached
    #[error("Reminder capacity exhausted: at most {limit} reminders may be pending")]
    CapacityExhausted { limit: usize },

    /// The scheduler was torn down
    #[error("Reminder scheduler has been shut down")]
    ShutDown,
}

/// Errors raised by record, stats and medication sources.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The snapshot could not be read
    #[error("Failed to read snapshot from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be decoded
    #[error("Malformed snapshot {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Medication has no time-of-day slot
    #[error("Medication '{medication_id}' has no time-of-day slot")]
    EmptyTimeOfDay { medication_id: String },

    /// Slot name not in Morning/Afternoon/Evening/Night
    #[error("Unknown time-of-day slot: '{0}'")]
    UnknownSlot(String),

    /// Clock time not in HH:MM form
    #[error("Invalid clock time '{0}', expected HH:MM")]
    InvalidClockTime(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

impl From<tokio::runtime::TryCurrentError> for SchedulerError {
    fn from(_: tokio::runtime::TryCurrentError) -> Self {
        SchedulerError::NoRuntime
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
