//! Background replay of recorded tracks

use futures::Stream;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::replay::{
    Clock, PlaybackProgress, PlaybackState, PlaybackSummary, ReplayConfig, ReplayScheduler,
    TokioClock,
};
use crate::track::Track;
use crate::types::{Datagram, Schema};
use crate::{Result, TelemetryError};

/// Replay of a track running on its own task
///
/// The task owns the track for the duration of playback. Dropping the
/// connection cancels playback at the next frame boundary.
pub struct ReplayConnection {
    /// Progress watch receiver
    progress: watch::Receiver<PlaybackProgress>,

    /// Last delivered frame, replaced wholesale
    frames: watch::Receiver<Option<Arc<Datagram>>>,

    /// Schema of the track being played
    schema: Arc<Schema>,

    /// Simulated length of the track
    duration: Duration,

    /// Cancellation token for stopping playback
    cancel: CancellationToken,

    /// Playback task, until awaited
    task: Option<JoinHandle<PlaybackSummary>>,
}

impl ReplayConnection {
    /// Load a track file and start playing it in real time.
    pub async fn open<P, F>(path: P, config: &ReplayConfig, on_frame: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnMut(&Datagram) + Send + 'static,
    {
        let path = path.as_ref();
        info!("Opening track file: {}", path.display());

        let track = Track::open(path)?;
        Ok(Self::spawn(track, config, on_frame))
    }

    /// Play an already loaded track in real time.
    pub fn spawn<F>(track: Track, config: &ReplayConfig, on_frame: F) -> Self
    where
        F: FnMut(&Datagram) + Send + 'static,
    {
        Self::spawn_with_clock(track, TokioClock::new(), config, on_frame)
    }

    /// Play a track against a custom clock.
    pub fn spawn_with_clock<C, F>(
        track: Track,
        clock: C,
        config: &ReplayConfig,
        mut on_frame: F,
    ) -> Self
    where
        C: Clock + 'static,
        F: FnMut(&Datagram) + Send + 'static,
    {
        let (progress_tx, progress_rx) = watch::channel(PlaybackProgress {
            state: PlaybackState::Running,
            processed: 0,
            total: track.len(),
            skipped: 0,
            elapsed: Duration::ZERO,
            simulated: Duration::ZERO,
        });
        let (frame_tx, frame_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let schema = Arc::clone(track.schema());
        let duration = track.duration();
        let scheduler = ReplayScheduler::with_clock(clock, config.clone()).with_progress(progress_tx);
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            scheduler
                .play(
                    &track,
                    |frame| {
                        on_frame(frame);
                        frame_tx.send_replace(Some(Arc::new(frame.clone())));
                    },
                    &task_cancel,
                )
                .await
        });

        info!(frames = progress_rx.borrow().total, "Replay started ({:.1}s)", duration.as_secs_f64());

        Self { progress: progress_rx, frames: frame_rx, schema, duration, cancel, task: Some(task) }
    }

    /// Request playback to stop before the next frame.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> PlaybackProgress {
        self.progress.borrow().clone()
    }

    /// Progress snapshots as they are published, starting with the current one.
    pub fn progress_updates(&self) -> impl Stream<Item = PlaybackProgress> + Unpin + use<> {
        WatchStream::new(self.progress.clone())
    }

    /// Last frame handed to the callback.
    pub fn latest_frame(&self) -> Option<Arc<Datagram>> {
        self.frames.borrow().clone()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Simulated length of the track being played.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Wait for playback to finish or stop after cancellation.
    pub async fn wait(mut self) -> Result<PlaybackSummary> {
        let task = self
            .task
            .take()
            .ok_or_else(|| TelemetryError::Playback { reason: "already awaited".to_string() })?;
        task.await.map_err(|e| TelemetryError::Playback { reason: e.to_string() })
    }
}

impl Drop for ReplayConnection {
    fn drop(&mut self) {
        debug!("Dropping replay connection");
        // Cancel tasks on drop for clean shutdown
        self.cancel.cancel();
    }
}
