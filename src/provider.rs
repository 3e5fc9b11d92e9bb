//! Provider trait for telemetry sources

use std::sync::Arc;

use super::types::{FramePacket, Schema};
use crate::Result;

/// Trait for telemetry data sources
///
/// Providers abstract over where raw blocks come from (a UDP socket, an
/// in-memory capture) and deliver them one at a time in arrival order. Decoding
/// is left to the driver so that a malformed block stops ingestion in one place.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Wait for the next raw block
    ///
    /// Returns:
    /// - `Ok(Some(packet))` - A block arrived
    /// - `Ok(None)` - Source exhausted (normal termination)
    /// - `Err(e)` - Transport failure or framing violation
    ///
    /// Framing violations (a message whose length is not the block length) are
    /// `Protocol` errors; the driver does not retry them.
    async fn next_block(&mut self) -> Result<Option<FramePacket>>;

    /// Schema every block from this source is framed against
    fn schema(&self) -> Arc<Schema>;
}
