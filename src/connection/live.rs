//! Live telemetry connection over UDP

use futures::{Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{UnboundedReceiverStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::TelemetryConfig;
use crate::driver::{Driver, IngestSummary, LiveSample};
use crate::provider::Provider;
use crate::providers::UdpProvider;
use crate::session::{EpisodeReport, SessionTracker, TrackerConfig};
use crate::track::Recorder;
use crate::types::Schema;
use crate::{Result, TelemetryError};

/// Live connection to the simulator's telemetry stream
pub struct LiveConnection {
    /// Latest sample watch receiver
    samples: watch::Receiver<Option<Arc<LiveSample>>>,

    /// Finalized episodes, until taken
    reports: Option<mpsc::UnboundedReceiver<EpisodeReport>>,

    /// Field schema blocks are decoded with
    schema: Arc<Schema>,

    /// Bound socket address, for UDP sources
    local_addr: Option<SocketAddr>,

    /// Cancellation token for stopping the driver
    cancel: CancellationToken,

    /// Ingestion task, until awaited
    task: Option<JoinHandle<Result<IngestSummary>>>,
}

impl LiveConnection {
    /// Bind the configured endpoint and start ingesting.
    ///
    /// The schema must describe at least one known field. Returns as soon as
    /// the socket is bound; samples arrive once the simulator starts sending.
    pub async fn listen(config: &TelemetryConfig) -> Result<Self> {
        info!(endpoint = %config.endpoint, "Starting live telemetry listener");

        let schema = Arc::new(config.schema());
        schema.validate()?;

        let provider = UdpProvider::bind(&config.endpoint, Arc::clone(&schema)).await?;
        let local_addr = provider.local_addr()?;

        let recorder = match &config.recording {
            Some(recording) => Some(Recorder::start(recording.clone(), Arc::clone(&schema))?),
            None => None,
        };

        let mut connection = Self::from_provider(provider, config.tracker.clone(), recorder);
        connection.local_addr = Some(local_addr);

        info!(address = %local_addr, "Live connection established, waiting for telemetry");
        Ok(connection)
    }

    /// Start ingesting from any provider.
    pub fn from_provider<P: Provider>(
        provider: P,
        tracker: TrackerConfig,
        recorder: Option<Recorder>,
    ) -> Self {
        let schema = provider.schema();
        let tracker = SessionTracker::new(Arc::clone(&schema), tracker);
        let channels = Driver::spawn(provider, tracker, recorder);

        Self {
            samples: channels.samples,
            reports: Some(channels.reports),
            schema,
            local_addr: None,
            cancel: channels.cancel,
            task: Some(channels.task),
        }
    }

    /// Most recent decoded sample, if any has arrived.
    pub fn latest(&self) -> Option<Arc<LiveSample>> {
        self.samples.borrow().clone()
    }

    /// Stream of samples as they are published.
    ///
    /// Yields the current sample immediately when there is one. Slow consumers
    /// see only the latest sample, never a backlog.
    pub fn sample_updates(&self) -> impl Stream<Item = Arc<LiveSample>> + Unpin + use<> {
        WatchStream::new(self.samples.clone()).filter_map(|opt| async move { opt }).boxed()
    }

    /// Take the stream of finalized sessions and laps.
    ///
    /// Returns `None` after the first call.
    pub fn take_reports(&mut self) -> Option<impl Stream<Item = EpisodeReport> + Unpin + use<>> {
        self.reports.take().map(UnboundedReceiverStream::new)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Address the UDP socket is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop ingesting, report the open session and return the run's counters.
    pub async fn shutdown(mut self) -> Result<IngestSummary> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the source to end on its own.
    pub async fn wait(mut self) -> Result<IngestSummary> {
        self.join().await
    }

    async fn join(&mut self) -> Result<IngestSummary> {
        let task = self
            .task
            .take()
            .ok_or_else(|| TelemetryError::connection_failed("Ingestion task already joined"))?;
        task.await.map_err(|e| {
            TelemetryError::connection_failed(format!("Ingestion task did not complete: {}", e))
        })?
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        debug!("Dropping live connection");
        // Cancel tasks on drop for clean shutdown
        self.cancel.cancel();
    }
}
