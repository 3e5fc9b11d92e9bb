//! Driver spawns and manages the live ingestion task

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::provider::Provider;
use crate::session::{
    Disposition, EpisodeKind, EpisodeReport, LogSink, ReportSink, SessionTracker,
};
use crate::track::Recorder;
use crate::types::Datagram;
use crate::Result;

/// Consecutive transport failures tolerated before giving up.
const MAX_ERRORS: u32 = 10;

/// Latest decoded sample, replaced wholesale on every block.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSample {
    /// Arrival counter of the block it was decoded from
    pub sequence: u64,
    pub datagram: Datagram,
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    /// Blocks received and decoded
    pub blocks: u64,
    pub accepted: u64,
    pub downsampled: u64,
    pub idle: u64,
    pub sessions_reported: u32,
    pub laps_reported: u32,
    /// Stopped by cancellation rather than by the source ending
    pub cancelled: bool,
    /// Last recording file, when recording was enabled
    pub recording: Option<PathBuf>,
}

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Latest sample; `None` until the first block arrives
    pub samples: watch::Receiver<Option<Arc<LiveSample>>>,
    /// Finalized sessions and laps, in order
    pub reports: mpsc::UnboundedReceiver<EpisodeReport>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// Resolves once ingestion stops
    pub task: JoinHandle<Result<IngestSummary>>,
}

/// Driver spawns and manages the live ingestion task
///
/// A single task owns the provider, the session tracker and the recorder, so
/// segmentation state is mutated strictly in arrival order.
pub struct Driver;

impl Driver {
    /// Spawn the ingestion task for the given provider
    pub fn spawn<P>(provider: P, tracker: SessionTracker, recorder: Option<Recorder>) -> DriverChannels
    where
        P: Provider,
    {
        let (sample_tx, sample_rx) = watch::channel(None);
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let ingest = Ingest {
            tracker,
            recorder,
            sample_tx,
            report_tx,
            summary: IngestSummary::default(),
        };
        let task = tokio::spawn(ingest.run(provider, cancel.clone()));

        DriverChannels { samples: sample_rx, reports: report_rx, cancel, task }
    }
}

/// State owned by the ingestion task
struct Ingest {
    tracker: SessionTracker,
    recorder: Option<Recorder>,
    sample_tx: watch::Sender<Option<Arc<LiveSample>>>,
    report_tx: mpsc::UnboundedSender<EpisodeReport>,
    summary: IngestSummary,
}

impl Ingest {
    async fn run<P: Provider>(mut self, mut provider: P, cancel: CancellationToken) -> Result<IngestSummary> {
        info!("Ingestion task started");
        let outcome = self.read_loop(&mut provider, &cancel).await;

        // The open session is reported however ingestion stopped
        let mut pending: Vec<EpisodeReport> = Vec::new();
        self.tracker.finish(&mut pending);
        self.deliver(pending);

        if let Some(recorder) = self.recorder.take() {
            self.summary.recording = Some(recorder.finish()?);
        }

        info!(
            blocks = self.summary.blocks,
            accepted = self.summary.accepted,
            sessions = self.summary.sessions_reported,
            laps = self.summary.laps_reported,
            "Ingestion task ended"
        );

        outcome.map(|()| self.summary)
    }

    async fn read_loop<P: Provider>(&mut self, provider: &mut P, cancel: &CancellationToken) -> Result<()> {
        let mut error_count = 0u32;

        loop {
            if cancel.is_cancelled() {
                info!("Ingestion cancelled");
                self.summary.cancelled = true;
                return Ok(());
            }

            // Use select to allow cancellation while waiting on the transport
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Ingestion cancelled during read");
                    self.summary.cancelled = true;
                    return Ok(());
                }
                result = provider.next_block() => result,
            };

            match result {
                Ok(Some(packet)) => {
                    error_count = 0;
                    let datagram = packet.decode()?;
                    self.ingest(packet.sequence, datagram)?;
                }
                Ok(None) => {
                    info!("Provider ended after {} blocks", self.summary.blocks);
                    return Ok(());
                }
                Err(e) if e.is_retryable() => {
                    error_count += 1;
                    warn!("Provider error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many provider errors, shutting down");
                        return Err(e);
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(e) => {
                    error!("Fatal telemetry error, stopping ingestion: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Segment, record and publish one decoded sample.
    fn ingest(&mut self, sequence: u64, datagram: Datagram) -> Result<()> {
        self.summary.blocks += 1;
        trace!(sequence, timestamp = datagram.timestamp, "Block decoded");

        let mut pending: Vec<EpisodeReport> = Vec::new();
        let disposition = self.tracker.observe(&datagram, &mut pending);
        let restarted = pending.iter().any(|r| r.kind == EpisodeKind::Session);
        self.deliver(pending);

        match disposition {
            Disposition::Downsampled => self.summary.downsampled += 1,
            Disposition::Idle => self.summary.idle += 1,
            Disposition::Accepted => {
                self.summary.accepted += 1;
                self.record(&datagram, restarted)?;
            }
        }

        self.sample_tx.send_replace(Some(Arc::new(LiveSample { sequence, datagram })));
        Ok(())
    }

    fn record(&mut self, datagram: &Datagram, restarted: bool) -> Result<()> {
        let Some(recorder) = self.recorder.as_mut() else {
            return Ok(());
        };
        if restarted && recorder.config().split_sessions {
            recorder.restart()?;
        }
        let session = self.tracker.session();
        recorder.record(datagram, session.index, session.events)
    }

    /// Log and forward finalized episodes.
    fn deliver(&mut self, reports: Vec<EpisodeReport>) {
        for report in reports {
            match report.kind {
                EpisodeKind::Session => self.summary.sessions_reported += 1,
                EpisodeKind::Lap => self.summary.laps_reported += 1,
            }
            LogSink.report(report.clone());
            if self.report_tx.send(report).is_err() {
                debug!("Report receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryProvider;
    use crate::session::TrackerConfig;
    use crate::test_utils::{circle_samples, sample};
    use crate::TelemetryError;
    use crate::types::Schema;

    fn tracker(schema: &Arc<Schema>) -> SessionTracker {
        SessionTracker::new(Arc::clone(schema), TrackerConfig::default())
    }

    #[tokio::test]
    async fn segments_a_capture_end_to_end() {
        let schema = Arc::new(Schema::resolve(["Timestamp", "Position", "Velocity"]));
        let mut samples = circle_samples([50.0, 1.0, 50.0], 20.0, 361);
        // Race restart: the clock jumps back
        samples.push(sample(0.0, 50.0, 50.0));
        samples.push(sample(0.01, 51.0, 50.0));

        let provider = MemoryProvider::from_samples(Arc::clone(&schema), &samples).expect("encode");
        let mut channels = Driver::spawn(provider, tracker(&schema), None);

        let summary = channels.task.await.expect("join").expect("ingest");
        assert_eq!(summary.blocks, samples.len() as u64);
        assert_eq!(summary.accepted, samples.len() as u64);
        assert_eq!(summary.laps_reported, 1);
        // The restart plus the session open at shutdown
        assert_eq!(summary.sessions_reported, 2);
        assert!(!summary.cancelled);

        let mut kinds = Vec::new();
        while let Ok(report) = channels.reports.try_recv() {
            kinds.push((report.kind, report.index));
        }
        assert_eq!(
            kinds,
            vec![(EpisodeKind::Lap, 1), (EpisodeKind::Session, 1), (EpisodeKind::Session, 2)]
        );

        let latest = channels.samples.borrow().clone().expect("latest sample");
        assert_eq!(latest.sequence, samples.len() as u64);
        assert_eq!(latest.datagram, samples[samples.len() - 1]);
    }

    #[tokio::test]
    async fn malformed_block_stops_ingestion_without_retry() {
        let schema = Arc::new(Schema::full());
        let good = crate::codec::encode(&schema, &sample(1.0, 2.0, 3.0)).expect("encode");
        let provider = MemoryProvider::new(
            Arc::clone(&schema),
            vec![good.clone(), vec![0u8; 40], good],
        );

        let mut channels = Driver::spawn(provider, tracker(&schema), None);
        let err = channels.task.await.expect("join").expect_err("protocol violation");
        assert!(matches!(err, TelemetryError::Protocol { .. }));

        // The session in progress is still reported
        let report = channels.reports.try_recv().expect("session report");
        assert_eq!(report.kind, EpisodeKind::Session);
        assert_eq!(report.events, 1);
    }

    #[tokio::test]
    async fn cancellation_reports_open_session() {
        let schema = Arc::new(Schema::full());
        let stalled = crate::test_utils::PendingProvider::new(Arc::clone(&schema));

        let mut channels = Driver::spawn(stalled, tracker(&schema), None);
        channels.cancel.cancel();

        let summary = channels.task.await.expect("join").expect("clean stop");
        assert!(summary.cancelled);
        assert_eq!(summary.blocks, 0);
        assert_eq!(summary.sessions_reported, 1);
        assert!(channels.reports.try_recv().is_ok());
        assert!(channels.samples.borrow().is_none());
    }

    #[tokio::test]
    async fn recording_writes_accepted_samples() {
        let dir = tempfile::tempdir().expect("tempdir");
        let schema = Arc::new(Schema::resolve(["Timestamp", "Position"]));
        let recording = crate::track::RecordingConfig {
            directory: dir.path().to_path_buf(),
            ..Default::default()
        };
        let recorder = Recorder::start(recording, Arc::clone(&schema)).expect("recorder");

        let samples: Vec<Datagram> = (0..6).map(|i| sample(i as f32 * 0.1, 5.0 + i as f32, 5.0)).collect();
        let provider = MemoryProvider::from_samples(Arc::clone(&schema), &samples).expect("encode");
        let config = TrackerConfig { downsample_stride: 2, ..TrackerConfig::default() };
        let tracker = SessionTracker::new(Arc::clone(&schema), config);

        let channels = Driver::spawn(provider, tracker, Some(recorder));
        let summary = channels.task.await.expect("join").expect("ingest");
        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.downsampled, 3);

        let path = summary.recording.expect("recording path");
        let track = crate::track::Track::open(&path).expect("load recording");
        let timestamps: Vec<f32> = track.samples().iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![0.0, 0.2, 0.4]);
    }
}
