//! Schema-driven telemetry for FPV drone simulators.
//!
//! Flightdeck ingests the simulator's UDP telemetry stream, whose block layout
//! is chosen at runtime by the simulator's configuration, and turns it into
//! decoded samples, session and lap summaries, recordings, and paced replays.
//!
//! # Features
//!
//! - **Runtime schema**: field order and presence come from configuration
//! - **Session tracking**: restarts, finishes and closed laps detected from the stream
//! - **Recording**: binary tracks and CSV exports
//! - **Replay**: real-time playback that skips late frames instead of drifting
//!
//! # Quick Start
//!
//! ## Example (live)
//!
//! ```rust,no_run
//! use flightdeck::Flightdeck;
//! use flightdeck::config::TelemetryConfig;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> flightdeck::Result<()> {
//!     let mut connection = Flightdeck::listen(&TelemetryConfig::default()).await?;
//!     let mut reports = connection.take_reports().expect("reports");
//!
//!     while let Some(report) = reports.next().await {
//!         println!("{}", report);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Example (replay)
//!
//! ```rust,no_run
//! use flightdeck::Flightdeck;
//! use flightdeck::replay::ReplayConfig;
//!
//! #[tokio::main]
//! async fn main() -> flightdeck::Result<()> {
//!     let replay = Flightdeck::open("flight.bin", &ReplayConfig::default(), |frame| {
//!         println!("{:.3}s at {:?}", frame.timestamp, frame.position);
//!     })
//!     .await?;
//!
//!     let summary = replay.wait().await?;
//!     println!("{} frames, {} skipped", summary.processed, summary.skipped);
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod codec;
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Stream processing
pub mod replay;
pub mod session;
pub mod track;

// Stream-based telemetry architecture
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use config::TelemetryConfig;
pub use connection::live::LiveConnection;
pub use connection::replay::ReplayConnection;
pub use replay::{PlaybackProgress, PlaybackSummary, ReplayScheduler};
pub use session::{EpisodeReport, SessionTracker};
pub use track::Track;

/// Unified entry point for telemetry connections.
///
/// # Examples
///
/// ```rust,no_run
/// use flightdeck::{Flightdeck, TelemetryConfig};
///
/// #[tokio::main]
/// async fn main() -> flightdeck::Result<()> {
///     let config = TelemetryConfig::load("TelemetryConfiguration.json")?;
///     let connection = Flightdeck::listen(&config).await?;
///     // Use connection...
///     let summary = connection.shutdown().await?;
///     println!("{} blocks", summary.blocks);
///     Ok(())
/// }
/// ```
pub struct Flightdeck;

impl Flightdeck {
    /// Listen for live telemetry on the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The stream format names no known field (`Configuration`)
    /// - The endpoint cannot be bound (`Connection`)
    /// - Recording is enabled and the file cannot be created (`File`)
    pub async fn listen(config: &TelemetryConfig) -> Result<LiveConnection> {
        LiveConnection::listen(config).await
    }

    /// Open a track file and replay it in real time.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File does not exist or is not readable (`File`)
    /// - The header is missing or a block is truncated (`Format`)
    /// - The header names no known field (`Configuration`)
    pub async fn open<P, F>(
        path: P,
        config: &replay::ReplayConfig,
        on_frame: F,
    ) -> Result<ReplayConnection>
    where
        P: AsRef<std::path::Path>,
        F: FnMut(&Datagram) + Send + 'static,
    {
        ReplayConnection::open(path, config, on_frame).await
    }
}
