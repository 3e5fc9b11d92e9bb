//! Track file parsing

use std::sync::Arc;
use tracing::{debug, info};

use super::Track;
use crate::codec;
use crate::types::Schema;
use crate::{Result, TelemetryError};

/// Parse a complete track file image.
pub(crate) fn parse(data: &[u8], origin: &str) -> Result<Track> {
    let (header, body) = split_header(data, origin)?;

    let schema = Schema::resolve(header.split(','));
    schema.validate()?;
    let block_length = schema.block_length();

    debug!(header, block_length, origin, "Parsed track header");

    let records = body.len() / block_length;
    let remainder = body.len() % block_length;
    if remainder != 0 {
        return Err(TelemetryError::format_error(
            origin,
            format!(
                "truncated block {}: expected {} bytes, found {}",
                records, block_length, remainder
            ),
        ));
    }

    let mut samples = Vec::with_capacity(records);
    for (index, block) in body.chunks_exact(block_length).enumerate() {
        let sample = codec::decode(&schema, block).map_err(|e| {
            TelemetryError::format_error(origin, format!("block {} does not decode: {}", index, e))
        })?;
        samples.push(sample);
    }

    let track = Track::with_origin(Arc::new(schema), samples, origin.to_string());
    info!(
        origin,
        blocks = track.len(),
        min_ts = track.min_timestamp(),
        max_ts = track.max_timestamp(),
        "Loaded track"
    );
    Ok(track)
}

/// Split off the newline-terminated header line.
fn split_header<'a>(data: &'a [u8], origin: &str) -> Result<(&'a str, &'a [u8])> {
    let newline = data
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| TelemetryError::format_error(origin, "missing header line"))?;

    let header = std::str::from_utf8(&data[..newline])
        .map_err(|e| TelemetryError::format_error(origin, format!("header is not UTF-8: {}", e)))?
        .trim();

    if header.is_empty() {
        return Err(TelemetryError::format_error(origin, "empty header line"));
    }

    Ok((header, &data[newline + 1..]))
}
