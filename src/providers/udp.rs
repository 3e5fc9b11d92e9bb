//! UDP provider for the simulator's telemetry stream

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::provider::Provider;
use crate::types::{FramePacket, Schema};
use crate::{Result, TelemetryError};

/// Receive buffer size; comfortably above any block the simulator emits.
const MAX_PACKET_SIZE: usize = 4096;

/// Provider that receives one block per datagram.
///
/// There is no receive timeout: a silent simulator blocks ingestion until data
/// arrives or the driver is cancelled.
pub struct UdpProvider {
    socket: UdpSocket,
    schema: Arc<Schema>,
    buffer: Vec<u8>,
    sequence: u64,
}

impl UdpProvider {
    /// Bind to `endpoint` (for example `127.0.0.1:9001`, or port 0 for any free port).
    pub async fn bind(endpoint: &str, schema: Arc<Schema>) -> Result<Self> {
        let socket = UdpSocket::bind(endpoint).await.map_err(|e| {
            TelemetryError::connection_failed_with_source(format!("Cannot bind {}", endpoint), e)
        })?;

        let local = socket.local_addr().map_err(|e| {
            TelemetryError::connection_failed_with_source("Cannot read bound address", e)
        })?;
        info!(
            address = %local,
            block_length = schema.block_length(),
            "Telemetry UDP listener bound"
        );

        Ok(Self { socket, schema, buffer: vec![0u8; MAX_PACKET_SIZE], sequence: 0 })
    }

    /// Address the socket is actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(|e| {
            TelemetryError::connection_failed_with_source("Cannot read bound address", e)
        })
    }
}

#[async_trait::async_trait]
impl Provider for UdpProvider {
    async fn next_block(&mut self) -> Result<Option<FramePacket>> {
        let (len, peer) = self.socket.recv_from(&mut self.buffer).await.map_err(|e| {
            TelemetryError::connection_failed_with_source("UDP receive failed", e)
        })?;

        let expected = self.schema.block_length();
        if len != expected {
            debug!(peer = %peer, len, expected, "Rejecting message with wrong length");
            return Err(TelemetryError::length_mismatch(expected, len));
        }

        self.sequence += 1;
        trace!(peer = %peer, len, sequence = self.sequence, "Received block");

        Ok(Some(FramePacket::new(
            self.buffer[..len].to_vec(),
            self.sequence,
            Arc::clone(&self.schema),
        )))
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }
}
