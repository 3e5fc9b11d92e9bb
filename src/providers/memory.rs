//! In-memory provider for captured messages

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::provider::Provider;
use crate::types::{Datagram, FramePacket, Schema};
use crate::{Result, TelemetryError, codec};

/// Provider that replays captured raw messages as fast as they are read.
///
/// Messages are checked against the block length exactly as the UDP provider
/// does, so a capture exercises the same framing rules as a live socket.
pub struct MemoryProvider {
    schema: Arc<Schema>,
    messages: VecDeque<Vec<u8>>,
    sequence: u64,
}

impl MemoryProvider {
    pub fn new(schema: Arc<Schema>, messages: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self { schema, messages: messages.into_iter().collect(), sequence: 0 }
    }

    /// Encode `samples` with `schema` and serve them as messages.
    pub fn from_samples<'a>(
        schema: Arc<Schema>,
        samples: impl IntoIterator<Item = &'a Datagram>,
    ) -> Result<Self> {
        let messages = samples
            .into_iter()
            .map(|sample| codec::encode(&schema, sample))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(schema, messages))
    }

    /// Messages not yet delivered.
    pub fn remaining(&self) -> usize {
        self.messages.len()
    }
}

#[async_trait::async_trait]
impl Provider for MemoryProvider {
    async fn next_block(&mut self) -> Result<Option<FramePacket>> {
        let Some(message) = self.messages.pop_front() else {
            debug!(delivered = self.sequence, "Memory provider exhausted");
            return Ok(None);
        };

        let expected = self.schema.block_length();
        if message.len() != expected {
            return Err(TelemetryError::length_mismatch(expected, message.len()));
        }

        self.sequence += 1;
        Ok(Some(FramePacket::new(message, self.sequence, Arc::clone(&self.schema))))
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }
}
