//! Raw frame packets received from a transport

use std::sync::Arc;

use super::{Datagram, Schema};
use crate::Result;

/// Raw telemetry message as it arrived from the transport.
///
/// Decoding is deferred so the ingestion task decides when a malformed
/// message stops the stream.
#[derive(Debug, Clone)]
pub struct FramePacket {
    /// Message bytes (zero-copy via Arc)
    pub data: Arc<[u8]>,

    /// Arrival counter, starting at 1
    pub sequence: u64,

    /// Schema the message was framed against
    pub schema: Arc<Schema>,
}

impl FramePacket {
    /// Create a new frame packet
    pub fn new(data: Vec<u8>, sequence: u64, schema: Arc<Schema>) -> Self {
        Self { data: data.into(), sequence, schema }
    }

    /// Decode the message, enforcing the exact block length of the wire format.
    pub fn decode(&self) -> Result<Datagram> {
        crate::codec::decode_message(&self.schema, &self.data)
    }
}
