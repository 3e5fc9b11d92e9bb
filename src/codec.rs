//! Schema-driven block codec.
//!
//! A block is the concatenation of the schema's fields in order, every float
//! little-endian IEEE-754. A motor array is a one byte count followed by that
//! many floats, so the true length of a block is only known while decoding it.
//! The decoder is a left-to-right cursor that advances by each field's actual
//! width.
//!
//! ```rust
//! use flightdeck::codec::{decode, encode};
//! use flightdeck::types::{Datagram, Schema};
//!
//! let schema = Schema::resolve(["Timestamp", "Position"]);
//! let sample = Datagram::at(12.5, [1.0, 2.0, 3.0]);
//! let bytes = encode(&schema, &sample)?;
//! assert_eq!(bytes.len(), schema.block_length());
//! assert_eq!(decode(&schema, &bytes)?, sample);
//! # Ok::<(), flightdeck::TelemetryError>(())
//! ```

use crate::types::{BYTE, Datagram, FLOAT32, FieldKind, Schema};
use crate::{Result, TelemetryError};

/// Values with a fixed little-endian wire representation.
pub trait WireValue: Sized {
    /// Encoded size in bytes.
    const WIDTH: usize;

    /// Parse from exactly [`Self::WIDTH`] bytes.
    fn read(bytes: &[u8]) -> Self;

    /// Append the encoded form to `out`.
    fn write(&self, out: &mut Vec<u8>);
}

impl WireValue for u8 {
    const WIDTH: usize = BYTE;

    fn read(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl WireValue for f32 {
    const WIDTH: usize = FLOAT32;

    fn read(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

// Array support: vectors and quaternions are runs of floats
impl<const N: usize> WireValue for [f32; N] {
    const WIDTH: usize = N * FLOAT32;

    fn read(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| f32::read(&bytes[i * FLOAT32..(i + 1) * FLOAT32]))
    }

    fn write(&self, out: &mut Vec<u8>) {
        for value in self {
            value.write(out);
        }
    }
}

/// Bounds-checked reader over one block.
struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, field: FieldKind, len: usize) -> Result<&'a [u8]> {
        let available = self.data.len() - self.offset;
        if len > available {
            return Err(TelemetryError::truncated_field(field, self.offset, len, available));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn read<T: WireValue>(&mut self, field: FieldKind) -> Result<T> {
        let bytes = self.take(field, T::WIDTH)?;
        Ok(T::read(bytes))
    }
}

/// Decode one block in schema order.
///
/// Bytes after the last field are ignored; a field that runs past the end of
/// `bytes` is a protocol error.
pub fn decode(schema: &Schema, bytes: &[u8]) -> Result<Datagram> {
    let mut cursor = Cursor::new(bytes);
    let mut datagram = Datagram::default();

    for &field in schema.fields() {
        match field {
            FieldKind::Timestamp => datagram.timestamp = cursor.read(field)?,
            FieldKind::Position => datagram.position = cursor.read(field)?,
            FieldKind::Attitude => datagram.attitude = cursor.read(field)?,
            FieldKind::Velocity => datagram.velocity = cursor.read(field)?,
            FieldKind::Gyro => datagram.gyro = cursor.read(field)?,
            FieldKind::Input => datagram.input = cursor.read(field)?,
            FieldKind::Battery => datagram.battery = cursor.read(field)?,
            FieldKind::MotorArray => {
                let count: u8 = cursor.read(field)?;
                let raw = cursor.take(field, usize::from(count) * FLOAT32)?;
                datagram.motor_rpm = raw.chunks_exact(FLOAT32).map(f32::read).collect();
            }
            FieldKind::Unknown => {}
        }
    }

    Ok(datagram)
}

/// Decode a live transport message, which must be exactly one block long.
pub fn decode_message(schema: &Schema, bytes: &[u8]) -> Result<Datagram> {
    let expected = schema.block_length();
    if bytes.len() != expected {
        return Err(TelemetryError::length_mismatch(expected, bytes.len()));
    }
    decode(schema, bytes)
}

/// Append the encoded block for `datagram` to `out`.
pub fn encode_into(schema: &Schema, datagram: &Datagram, out: &mut Vec<u8>) -> Result<()> {
    for &field in schema.fields() {
        match field {
            FieldKind::Timestamp => datagram.timestamp.write(out),
            FieldKind::Position => datagram.position.write(out),
            FieldKind::Attitude => datagram.attitude.write(out),
            FieldKind::Velocity => datagram.velocity.write(out),
            FieldKind::Gyro => datagram.gyro.write(out),
            FieldKind::Input => datagram.input.write(out),
            FieldKind::Battery => datagram.battery.write(out),
            FieldKind::MotorArray => {
                let count = u8::try_from(datagram.motor_rpm.len()).map_err(|_| {
                    TelemetryError::Protocol {
                        context: "MotorRPM encoding".to_string(),
                        details: format!(
                            "{} motors do not fit the one byte count",
                            datagram.motor_rpm.len()
                        ),
                    }
                })?;
                count.write(out);
                for rpm in &datagram.motor_rpm {
                    rpm.write(out);
                }
            }
            FieldKind::Unknown => {}
        }
    }
    Ok(())
}

/// Encode `datagram` as one block.
pub fn encode(schema: &Schema, datagram: &Datagram) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(schema.block_length());
    encode_into(schema, datagram, &mut out)?;
    Ok(out)
}
