//! Core error types for roomtimer-core.
//!
//! Construction errors are the only fatal ones: a device with an invalid
//! configuration is never built. Invalid state transitions at runtime are
//! handled as logged no-ops, not errors (the upstream control signals are
//! momentary and may arrive redundantly).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for roomtimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tick-scheduling errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Tick-scheduler errors. Failure to arm a cadence is fatal to that engine
/// instance: the engine surfaces a terminal notification and returns to idle
/// rather than silently not counting.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// No tokio runtime was available to drive the tick task
    #[error("no tokio runtime available to drive the tick cadence")]
    NoRuntime,

    /// The scheduler handle is unusable (its lock was poisoned)
    #[error("tick scheduler handle is unusable")]
    HandleUnusable,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
