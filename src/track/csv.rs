//! Reading control inputs back out of a CSV export.

use std::io::BufRead;

use crate::{Result, TelemetryError};

/// Number of top-level columns in a CSV export line.
pub const CSV_COLUMNS: usize = 9;

const TIMESTAMP_COLUMN: usize = 2;
const INPUT_COLUMN: usize = 7;

/// Control inputs at one point in simulation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputRecord {
    pub timestamp: f32,
    /// Throttle, yaw, pitch, roll
    pub input: [f32; 4],
}

/// Read the timestamp and input columns of a CSV export.
///
/// Blank lines and lines starting with `#` are skipped, as is the leading
/// field-name header. Every other line must have exactly nine columns.
pub fn read_input_records<R: BufRead>(source: R) -> Result<Vec<InputRecord>> {
    let mut records = Vec::new();
    let mut seen_content = false;

    for (index, line) in source.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let first_content = !seen_content;
        seen_content = true;

        let parts: Vec<&str> = line.split(',').collect();
        if first_content && parts[0].trim().parse::<u32>().is_err() {
            continue;
        }

        if parts.len() != CSV_COLUMNS {
            return Err(invalid_line(
                index,
                format!("expected {} columns, found {}: {}", CSV_COLUMNS, parts.len(), line),
            ));
        }

        let timestamp = parse_float(parts[TIMESTAMP_COLUMN]).ok_or_else(|| {
            invalid_line(index, format!("timestamp is not a number: {}", parts[TIMESTAMP_COLUMN]))
        })?;
        let input = parse_vector(parts[INPUT_COLUMN]).ok_or_else(|| {
            invalid_line(index, format!("input is not four numbers: {}", parts[INPUT_COLUMN]))
        })?;

        records.push(InputRecord { timestamp, input });
    }

    Ok(records)
}

fn invalid_line(index: usize, details: String) -> TelemetryError {
    TelemetryError::format_error(format!("CSV line {}", index + 1), details)
}

fn parse_float(text: &str) -> Option<f32> {
    text.trim().parse().ok()
}

fn parse_vector<const N: usize>(text: &str) -> Option<[f32; N]> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
    let values: Vec<f32> = inner.split_whitespace().map(parse_float).collect::<Option<_>>()?;
    values.try_into().ok()
}
