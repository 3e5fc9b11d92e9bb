//! Recorded telemetry tracks.
//!
//! A track file is a UTF-8 header line naming the fields, followed directly
//! by a binary body of concatenated blocks in wire format. Record boundaries
//! are implied by the schema's block length alone.
//!
//! ## Usage Example
//!
//! ```rust
//! use flightdeck::track::{Track, TrackWriter};
//! use flightdeck::types::{Datagram, Schema};
//! use std::sync::Arc;
//!
//! # fn main() -> flightdeck::Result<()> {
//! let schema = Arc::new(Schema::resolve(["Timestamp", "Position"]));
//! let mut writer = TrackWriter::new(Vec::new(), schema)?;
//! writer.write(&Datagram::at(1.5, [1.0, 2.0, 3.0]))?;
//! writer.write(&Datagram::at(1.6, [1.1, 2.0, 3.0]))?;
//!
//! let track = Track::from_bytes(&writer.into_inner()?)?;
//! assert_eq!(track.len(), 2);
//! assert_eq!(track.min_timestamp(), 1.5);
//! # Ok(())
//! # }
//! ```

pub mod csv;
mod reader;
mod writer;

pub use writer::{CsvTrackWriter, Recorder, RecordingConfig, RecordingFormat, TrackWriter};

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{Datagram, Schema};
use crate::{Result, TelemetryError};

/// A loaded sequence of samples plus the schema it was recorded with.
#[derive(Debug, Clone)]
pub struct Track {
    schema: Arc<Schema>,
    samples: Vec<Datagram>,
    min_timestamp: f32,
    max_timestamp: f32,
    origin: String,
}

impl Track {
    /// Load a track file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file =
            File::open(path).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;

        reader::parse(&data, &path.display().to_string())
    }

    /// Load a track from any byte source.
    pub fn from_reader<R: Read>(mut source: R) -> Result<Self> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        reader::parse(&data, "<reader>")
    }

    /// Load a track from an in-memory file image.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        reader::parse(data, "<memory>")
    }

    /// Build a track from already decoded samples.
    ///
    /// Timestamp bounds come from the first and last sample, as when loading.
    pub fn from_samples(schema: Arc<Schema>, samples: Vec<Datagram>) -> Self {
        Self::with_origin(schema, samples, "<memory>".to_string())
    }

    pub(crate) fn with_origin(schema: Arc<Schema>, samples: Vec<Datagram>, origin: String) -> Self {
        let min_timestamp = samples.first().map(|s| s.timestamp).unwrap_or_default();
        let max_timestamp = samples.last().map(|s| s.timestamp).unwrap_or_default();
        Self { schema, samples, min_timestamp, max_timestamp, origin }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn samples(&self) -> &[Datagram] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the first record. Not a scan for the minimum.
    pub fn min_timestamp(&self) -> f32 {
        self.min_timestamp
    }

    /// Timestamp of the last record. Not a scan for the maximum.
    pub fn max_timestamp(&self) -> f32 {
        self.max_timestamp
    }

    /// Simulated time covered by the track; zero if timestamps run backwards.
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.max_timestamp - self.min_timestamp).unwrap_or_default()
    }

    /// Where the track was loaded from, for log and error context.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn into_samples(self) -> Vec<Datagram> {
        self.samples
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a Datagram;
    type IntoIter = std::slice::Iter<'a, Datagram>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
