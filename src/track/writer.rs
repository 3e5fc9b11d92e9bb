//! Track recording in binary and CSV form

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::codec;
use crate::types::{Datagram, Schema};
use crate::{Result, TelemetryError};

/// File name prefix for recordings.
const FILE_PREFIX: &str = "liftoff_telemetry";

/// Writes the binary track format: header line, then one block per sample.
pub struct TrackWriter<W: Write> {
    inner: W,
    schema: Arc<Schema>,
    path: PathBuf,
    block: Vec<u8>,
    records: u64,
}

impl TrackWriter<BufWriter<File>> {
    /// Create (or truncate) a track file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, schema: Arc<Schema>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        Self::with_path(BufWriter::new(file), schema, path.to_path_buf())
    }
}

impl<W: Write> TrackWriter<W> {
    /// Wrap a writer and emit the header line.
    pub fn new(inner: W, schema: Arc<Schema>) -> Result<Self> {
        Self::with_path(inner, schema, PathBuf::from("<memory>"))
    }

    fn with_path(mut inner: W, schema: Arc<Schema>, path: PathBuf) -> Result<Self> {
        write_header(&mut inner, &schema).map_err(|e| TelemetryError::file_error(path.clone(), e))?;
        let block = Vec::with_capacity(schema.block_length());
        Ok(Self { inner, schema, path, block, records: 0 })
    }

    /// Append one sample.
    pub fn write(&mut self, sample: &Datagram) -> Result<()> {
        self.block.clear();
        codec::encode_into(&self.schema, sample, &mut self.block)?;
        self.inner
            .write_all(&self.block)
            .map_err(|e| TelemetryError::file_error(self.path.clone(), e))?;
        self.records += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(|e| TelemetryError::file_error(self.path.clone(), e))
    }

    /// Samples written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

/// Writes the CSV export: header line, then
/// `session,events,timestamp,position,attitude,velocity,gyro,input,motor_rpm` per sample.
///
/// Vectors render bracketed and space separated, e.g. `[1 2.5 -3]`.
pub struct CsvTrackWriter<W: Write> {
    inner: W,
    path: PathBuf,
    line: String,
    records: u64,
}

impl CsvTrackWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P, schema: &Schema) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        Self::with_path(BufWriter::new(file), schema, path.to_path_buf())
    }
}

impl<W: Write> CsvTrackWriter<W> {
    pub fn new(inner: W, schema: &Schema) -> Result<Self> {
        Self::with_path(inner, schema, PathBuf::from("<memory>"))
    }

    fn with_path(mut inner: W, schema: &Schema, path: PathBuf) -> Result<Self> {
        write_header(&mut inner, schema).map_err(|e| TelemetryError::file_error(path.clone(), e))?;
        Ok(Self { inner, path, line: String::new(), records: 0 })
    }

    /// Append one sample tagged with its session index and event counter.
    pub fn write(&mut self, sample: &Datagram, session_index: u32, events: u64) -> Result<()> {
        self.line.clear();
        // Writing to a String cannot fail
        let _ = write!(self.line, "{},{},{},", session_index, events, sample.timestamp);
        push_vector(&mut self.line, &sample.position);
        self.line.push(',');
        push_vector(&mut self.line, &sample.attitude);
        self.line.push(',');
        push_vector(&mut self.line, &sample.velocity);
        self.line.push(',');
        push_vector(&mut self.line, &sample.gyro);
        self.line.push(',');
        push_vector(&mut self.line, &sample.input);
        self.line.push(',');
        push_vector(&mut self.line, &sample.motor_rpm);
        self.line.push('\n');

        self.inner
            .write_all(self.line.as_bytes())
            .map_err(|e| TelemetryError::file_error(self.path.clone(), e))?;
        self.records += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(|e| TelemetryError::file_error(self.path.clone(), e))
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

fn write_header<W: Write>(out: &mut W, schema: &Schema) -> io::Result<()> {
    out.write_all(schema.header_line().as_bytes())?;
    out.write_all(b"\n")
}

fn push_vector(line: &mut String, values: &[f32]) {
    line.push('[');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{}", value);
    }
    line.push(']');
}

/// On-disk format of a recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingFormat {
    #[default]
    Bin,
    Csv,
}

impl RecordingFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RecordingFormat::Bin => "bin",
            RecordingFormat::Csv => "csv",
        }
    }
}

/// Where and how live samples are recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory that receives the recordings
    pub directory: PathBuf,
    pub format: RecordingFormat,
    /// Start a new file whenever a session restarts
    pub split_sessions: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("."), format: RecordingFormat::Bin, split_sessions: false }
    }
}

enum Output {
    Bin(TrackWriter<BufWriter<File>>),
    Csv(CsvTrackWriter<BufWriter<File>>),
}

/// Owns the configured writer and the file it writes to.
pub struct Recorder {
    config: RecordingConfig,
    schema: Arc<Schema>,
    path: PathBuf,
    output: Output,
}

impl Recorder {
    /// Open a fresh timestamped recording file.
    pub fn start(config: RecordingConfig, schema: Arc<Schema>) -> Result<Self> {
        let (path, output) = open_output(&config, &schema)?;
        info!(path = %path.display(), format = config.format.extension(), "Recording started");
        Ok(Self { config, schema, path, output })
    }

    /// Record one sample. Session index and event counter only appear in CSV.
    pub fn record(&mut self, sample: &Datagram, session_index: u32, events: u64) -> Result<()> {
        match &mut self.output {
            Output::Bin(writer) => writer.write(sample),
            Output::Csv(writer) => writer.write(sample, session_index, events),
        }
    }

    /// Close the current file and continue in a new one.
    pub fn restart(&mut self) -> Result<()> {
        self.flush()?;
        info!(path = %self.path.display(), records = self.records(), "Recording closed");

        let (path, output) = open_output(&self.config, &self.schema)?;
        debug!(path = %path.display(), "Recording restarted");
        self.path = path;
        self.output = output;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        match &mut self.output {
            Output::Bin(writer) => writer.flush(),
            Output::Csv(writer) => writer.flush(),
        }
    }

    /// Flush and close, returning the path of the last file.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.flush()?;
        info!(path = %self.path.display(), records = self.records(), "Recording closed");
        Ok(self.path)
    }

    /// Current output file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples written to the current file.
    pub fn records(&self) -> u64 {
        match &self.output {
            Output::Bin(writer) => writer.records(),
            Output::Csv(writer) => writer.records(),
        }
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }
}

fn open_output(config: &RecordingConfig, schema: &Arc<Schema>) -> Result<(PathBuf, Output)> {
    let (path, file) = create_unique(&config.directory, config.format.extension())?;
    let writer = BufWriter::new(file);
    let output = match config.format {
        RecordingFormat::Bin => {
            Output::Bin(TrackWriter::with_path(writer, Arc::clone(schema), path.clone())?)
        }
        RecordingFormat::Csv => Output::Csv(CsvTrackWriter::with_path(writer, schema, path.clone())?),
    };
    Ok((path, output))
}

/// Create `liftoff_telemetry_<YYYYMMDD_HHMMSS>.<ext>`, adding a counter when
/// a file with that name already exists (restarts within the same second).
fn create_unique(directory: &Path, extension: &str) -> Result<(PathBuf, File)> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let base = format!("{}_{}", FILE_PREFIX, stamp);

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}.{}", base, extension)
        } else {
            format!("{}_{}.{}", base, attempt, extension)
        };
        let path = directory.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(TelemetryError::file_error(path, e)),
        }
    }
}
