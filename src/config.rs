//! Telemetry configuration.
//!
//! The simulator describes its stream in a small JSON document with an
//! `EndPoint` and an ordered `StreamFormat` list. [`TelemetryConfig`] accepts
//! that document as is (JSON is a subset of YAML) and extends it with the
//! tracker, replay and recording settings:
//!
//! ```rust
//! use flightdeck::config::TelemetryConfig;
//!
//! let config = TelemetryConfig::from_yaml_str(
//!     r#"{"EndPoint": "127.0.0.1:9001", "StreamFormat": ["Timestamp", "Position"]}"#,
//! )?;
//! assert_eq!(config.schema().block_length(), 16);
//! # Ok::<(), flightdeck::TelemetryError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::replay::ReplayConfig;
use crate::session::TrackerConfig;
use crate::track::RecordingConfig;
use crate::types::{FieldKind, Schema};
use crate::{Result, TelemetryError};

/// Endpoint the simulator streams to unless configured otherwise.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:9001";

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// UDP address to listen on
    #[serde(alias = "EndPoint")]
    pub endpoint: String,
    /// Ordered field names of one block
    #[serde(alias = "StreamFormat")]
    pub stream_format: Vec<String>,
    pub tracker: TrackerConfig,
    pub replay: ReplayConfig,
    /// Record live samples to disk when present
    pub recording: Option<RecordingConfig>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            stream_format: FieldKind::KNOWN.iter().map(|k| k.name().to_string()).collect(),
            tracker: TrackerConfig::default(),
            replay: ReplayConfig::default(),
            recording: None,
        }
    }
}

impl TelemetryConfig {
    /// Parse a YAML or JSON document. Missing keys take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        debug!(endpoint = %config.endpoint, fields = config.stream_format.len(), "Parsed telemetry config");
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Resolve the stream format; unknown names become zero-width fields.
    pub fn schema(&self) -> Schema {
        Schema::resolve(&self.stream_format)
    }

    /// Resolve the stream format, rejecting unknown names.
    pub fn strict_schema(&self) -> Result<Schema> {
        Schema::resolve_strict(&self.stream_format)
    }
}
