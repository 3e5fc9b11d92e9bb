//! Error types for telemetry processing.
//!
//! All errors implement the `std::error::Error` trait and carry enough context
//! to tell a caller bug apart from an environmental failure.
//!
//! ## Error Categories
//!
//! - **Protocol Errors**: a wire message or block is shorter than the schema demands
//! - **Format Errors**: a persisted track file is malformed or truncated
//! - **Configuration Errors**: the field schema is empty, degenerate, or names unknown fields
//! - **File Errors**: I/O failures while reading or writing track files
//! - **Connection Errors**: the datagram transport could not be bound or read
//! - **Playback Errors**: a background replay task failed before reporting a summary
//!
//! ## Recovery and Retry
//!
//! Decode and load errors are never retried automatically. Only transport hiccups are:
//!
//! ```rust
//! use flightdeck::TelemetryError;
//!
//! let error = TelemetryError::length_mismatch(97, 64);
//! assert!(!error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::FieldKind;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Protocol violation in {context}: {details}")]
    Protocol { context: String, details: String },

    #[error("Track format error in {origin}: {details}")]
    Format { origin: String, details: String },

    #[error("Invalid telemetry configuration: {reason}")]
    Configuration { reason: String },

    #[error("Track file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Telemetry transport failure: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Playback task failed: {reason}")]
    Playback { reason: String },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Connection { .. } => true,
            TelemetryError::Protocol { .. } => false,
            TelemetryError::Format { .. } => false,
            TelemetryError::Configuration { .. } => false,
            TelemetryError::File { .. } => false,
            TelemetryError::Playback { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Protocol { .. } => vec![
                "Compare the simulator's StreamFormat with the configured field list",
                "Check that the motor count matches the assumed four motors",
                "Restart the stream once both sides agree on the schema",
            ],
            TelemetryError::Format { .. } => vec![
                "Check the track file starts with a comma-separated header line",
                "Verify the file was not truncated while recording",
                "Re-record the track with a matching stream format",
            ],
            TelemetryError::Configuration { .. } => vec![
                "List at least one known field in the stream format",
                "Check field name spelling and capitalisation",
            ],
            TelemetryError::File { .. } => vec![
                "Check file exists and is readable",
                "Ensure sufficient disk space",
                "Check file permissions",
            ],
            TelemetryError::Connection { .. } => vec![
                "Check the endpoint address and port are free",
                "Verify telemetry output is enabled in the simulator",
                "Retry once the network interface is available",
            ],
            TelemetryError::Playback { .. } => vec![
                "Inspect the frame callback for panics",
                "Restart playback from the beginning of the track",
            ],
        }
    }

    /// Helper constructor for a wire message whose length differs from the block length.
    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        TelemetryError::Protocol {
            context: "Message framing".to_string(),
            details: format!("expected {} bytes, received {}", expected, actual),
        }
    }

    /// Helper constructor for a field that runs past the end of the buffer.
    pub fn truncated_field(field: FieldKind, offset: usize, needed: usize, available: usize) -> Self {
        TelemetryError::Protocol {
            context: format!("{} field at offset {}", field.name(), offset),
            details: format!("needs {} bytes, only {} available", needed, available),
        }
    }

    /// Helper constructor for track format errors.
    pub fn format_error(origin: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Format { origin: origin.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn configuration(reason: impl Into<String>) -> Self {
        TelemetryError::Configuration { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for transport errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: Some(source.into()) }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for TelemetryError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TelemetryError::Configuration { reason: err.to_string() }
    }
}
