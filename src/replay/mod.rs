//! Real-time playback of recorded tracks.
//!
//! [`ReplayScheduler::play`] walks a [`Track`] once, pacing frame callbacks so
//! they happen at the same offsets from the start as the recorded timestamps.
//! The first frame fires immediately. Every later frame either waits for its
//! slot or, when the scheduler is already late, is skipped rather than
//! delivered late, so drift never compounds.
//!
//! Cancellation is cooperative: the token is polled once before each frame and
//! a sleep in progress is never interrupted.

mod clock;

pub use clock::{Clock, ManualClock, TokioClock};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::track::Track;
use crate::types::Datagram;

/// Pacing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Frames due sooner than this are delivered without sleeping
    pub epsilon_seconds: f64,
    /// Publish progress every N processed frames
    pub progress_interval: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { epsilon_seconds: 0.000_001, progress_interval: 100 }
    }
}

/// Playback lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Running,
    Finished,
    Terminated,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Running => f.write_str("Done"),
            PlaybackState::Finished => f.write_str("Finished"),
            PlaybackState::Terminated => f.write_str("Terminated on"),
        }
    }
}

/// Snapshot of playback progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackProgress {
    pub state: PlaybackState,
    /// Frames processed so far, delivered or skipped
    pub processed: usize,
    pub total: usize,
    pub skipped: usize,
    /// Wall time since playback started
    pub elapsed: Duration,
    /// Recorded time of the last processed frame, relative to the first
    pub simulated: Duration,
}

impl PlaybackProgress {
    fn starting(total: usize) -> Self {
        Self {
            state: PlaybackState::Running,
            processed: 0,
            total,
            skipped: 0,
            elapsed: Duration::ZERO,
            simulated: Duration::ZERO,
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 * 100.0 / self.total as f64
    }

    /// Wall time minus simulated time, in seconds; positive means behind.
    pub fn drift_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64() - self.simulated.as_secs_f64()
    }
}

impl std::fmt::Display for PlaybackProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}/{} ({:.1}%), elapsed {:.3}s, simulated {:.3}s, drift {:.3}s, skipped {}",
            self.state,
            self.processed,
            self.total,
            self.percent(),
            self.elapsed.as_secs_f64(),
            self.simulated.as_secs_f64(),
            self.drift_seconds(),
            self.skipped
        )
    }
}

/// Outcome of one playback pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSummary {
    /// Frames processed, delivered or skipped
    pub processed: usize,
    /// Frames handed to the callback
    pub invoked: usize,
    pub skipped: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub simulated: Duration,
    /// Wall minus simulated seconds at the end of playback
    pub drift_seconds: f64,
    pub cancelled: bool,
}

/// Paces frame callbacks against a [`Clock`].
pub struct ReplayScheduler<C: Clock = TokioClock> {
    clock: C,
    config: ReplayConfig,
    progress: Option<watch::Sender<PlaybackProgress>>,
}

impl ReplayScheduler<TokioClock> {
    /// Scheduler driven by real time.
    pub fn new(config: ReplayConfig) -> Self {
        Self::with_clock(TokioClock::new(), config)
    }
}

impl<C: Clock> ReplayScheduler<C> {
    pub fn with_clock(clock: C, config: ReplayConfig) -> Self {
        Self { clock, config, progress: None }
    }

    /// Publish progress snapshots on `sender` in addition to logging them.
    pub fn with_progress(mut self, sender: watch::Sender<PlaybackProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Play `track` once, handing each due frame to `on_frame`.
    pub async fn play<F>(
        &self,
        track: &Track,
        mut on_frame: F,
        cancel: &CancellationToken,
    ) -> PlaybackSummary
    where
        F: FnMut(&Datagram),
    {
        let total = track.len();
        let min_timestamp = track.min_timestamp();
        let epsilon = self.config.epsilon_seconds;
        let interval = self.config.progress_interval.max(1);

        info!(origin = track.origin(), frames = total, "Playback started");

        let start = self.clock.now();
        let mut progress = PlaybackProgress::starting(total);
        let mut invoked = 0usize;
        self.publish(&progress);

        for (index, frame) in track.samples().iter().enumerate() {
            if cancel.is_cancelled() {
                debug!(frame = index, "Playback cancelled");
                progress.state = PlaybackState::Terminated;
                break;
            }

            let target = f64::from(frame.timestamp - min_timestamp);
            if index == 0 {
                on_frame(frame);
                invoked += 1;
            } else {
                let elapsed = (self.clock.now() - start).as_secs_f64();
                let diff = target - elapsed;
                let due = if diff > epsilon {
                    match Duration::try_from_secs_f64(diff) {
                        Ok(wait) => {
                            self.clock.sleep(wait).await;
                            true
                        }
                        Err(_) => {
                            warn!(frame = index, timestamp = frame.timestamp, "Frame is never due");
                            false
                        }
                    }
                } else {
                    diff >= 0.0
                };
                if due {
                    on_frame(frame);
                    invoked += 1;
                } else {
                    progress.skipped += 1;
                }
            }

            progress.processed = index + 1;
            progress.elapsed = self.clock.now() - start;
            progress.simulated = Duration::try_from_secs_f64(target).unwrap_or_default();

            if progress.processed % interval == 0 && progress.processed < total {
                self.report(&progress);
            }
        }

        if progress.state == PlaybackState::Running {
            progress.state = PlaybackState::Finished;
        }
        progress.elapsed = self.clock.now() - start;
        self.report(&progress);

        PlaybackSummary {
            processed: progress.processed,
            invoked,
            skipped: progress.skipped,
            total,
            elapsed: progress.elapsed,
            simulated: progress.simulated,
            drift_seconds: progress.drift_seconds(),
            cancelled: progress.state == PlaybackState::Terminated,
        }
    }

    fn report(&self, progress: &PlaybackProgress) {
        info!("{}", progress);
        self.publish(progress);
    }

    fn publish(&self, progress: &PlaybackProgress) {
        if let Some(sender) = &self.progress {
            sender.send_replace(progress.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{timed_track, timestamps_track};
    use std::sync::{Arc, Mutex};

    fn manual_scheduler() -> (ManualClock, ReplayScheduler<ManualClock>) {
        let clock = ManualClock::new();
        let scheduler = ReplayScheduler::with_clock(clock.clone(), ReplayConfig::default());
        (clock, scheduler)
    }

    fn assert_close(actual: Duration, expected_secs: f64) {
        let delta = (actual.as_secs_f64() - expected_secs).abs();
        assert!(delta < 1e-6, "expected ~{}s, got {:?}", expected_secs, actual);
    }

    #[tokio::test]
    async fn paces_frames_on_schedule() {
        let (clock, scheduler) = manual_scheduler();
        let track = timestamps_track(&[0.0, 0.1, 0.2]);
        let delivered = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&delivered);
        let observer = clock.clone();
        let summary = scheduler
            .play(
                &track,
                move |frame| log.lock().expect("lock").push((frame.timestamp, observer.now())),
                &CancellationToken::new(),
            )
            .await;

        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 2);
        assert_close(sleeps[0], 0.1);
        assert_close(sleeps[1], 0.1);

        let delivered = delivered.lock().expect("lock").clone();
        assert_eq!(delivered.len(), 3);
        assert_eq!(delivered[0], (0.0, Duration::ZERO), "first frame fires immediately");
        assert_close(delivered[2].1, 0.2);

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.invoked, 3);
        assert_eq!(summary.skipped, 0);
        assert!(!summary.cancelled);
        assert!(summary.drift_seconds.abs() < 1e-6);
    }

    #[tokio::test]
    async fn late_frames_are_skipped_not_delivered() {
        let (clock, scheduler) = manual_scheduler();
        let track = timestamps_track(&[0.0, 0.1, 0.2, 0.8]);
        let mut seen = Vec::new();

        let stall = clock.clone();
        let summary = scheduler
            .play(
                &track,
                |frame| {
                    if frame.timestamp == 0.0 {
                        stall.advance(Duration::from_millis(500));
                    }
                    seen.push(frame.timestamp);
                },
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(seen, vec![0.0, 0.8]);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.invoked, 2);
        assert_eq!(summary.processed, 4);
        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 1, "only the last frame is ahead of the clock");
        assert_close(sleeps[0], 0.3);
    }

    #[tokio::test]
    async fn unreachable_timestamps_are_skipped() {
        for last in [f32::INFINITY, f32::MAX, f32::NAN] {
            let (clock, scheduler) = manual_scheduler();
            let track = timestamps_track(&[0.0, 0.5, last]);
            let mut seen = Vec::new();

            let summary = scheduler
                .play(&track, |frame| seen.push(frame.timestamp), &CancellationToken::new())
                .await;

            assert_eq!(seen, vec![0.0, 0.5], "last = {last}");
            assert_eq!(summary.processed, 3);
            assert_eq!(summary.skipped, 1);
            assert_eq!(clock.sleeps().len(), 1, "no wait is attempted for {last}");
        }
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_frame() {
        for k in 1..=4 {
            let (_clock, scheduler) = manual_scheduler();
            let track = timestamps_track(&[0.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
            let cancel = CancellationToken::new();
            let mut calls = 0;

            let summary = scheduler
                .play(
                    &track,
                    |_| {
                        calls += 1;
                        if calls == k {
                            cancel.cancel();
                        }
                    },
                    &cancel,
                )
                .await;

            assert_eq!(calls, k);
            assert_eq!(summary.processed, k);
            assert!(summary.cancelled);
        }
    }

    #[tokio::test]
    async fn cancelled_before_start_processes_nothing() {
        let (_clock, scheduler) = manual_scheduler();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = scheduler.play(&timestamps_track(&[0.0, 1.0]), |_| {}, &cancel).await;
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.invoked, 0);
        assert!(summary.cancelled);
    }

    #[tokio::test]
    async fn progress_is_published_per_interval_and_at_the_end() {
        let clock = ManualClock::new();
        let config = ReplayConfig { progress_interval: 10, ..ReplayConfig::default() };
        let (tx, mut rx) = watch::channel(PlaybackProgress::starting(0));
        let scheduler = ReplayScheduler::with_clock(clock, config).with_progress(tx);

        let track = timed_track(25, 0.01);
        let summary = scheduler.play(&track, |_| {}, &CancellationToken::new()).await;
        assert_eq!(summary.processed, 25);

        assert!(rx.has_changed().expect("sender alive"));
        let last = rx.borrow_and_update().clone();
        assert_eq!(last.state, PlaybackState::Finished);
        assert_eq!(last.processed, 25);
        assert_eq!(last.total, 25);
        assert_eq!(last.percent(), 100.0);
        assert!(last.to_string().starts_with("Finished 25/25 (100.0%)"));
    }

    #[tokio::test]
    async fn empty_track_finishes_immediately() {
        let (clock, scheduler) = manual_scheduler();
        let summary = scheduler.play(&timestamps_track(&[]), |_| {}, &CancellationToken::new()).await;
        assert_eq!(summary.processed, 0);
        assert!(!summary.cancelled);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn real_clock_paces_with_paused_time() {
        let scheduler = ReplayScheduler::new(ReplayConfig::default());
        let track = timestamps_track(&[10.0, 10.5, 11.0]);
        let started = tokio::time::Instant::now();

        let summary = scheduler.play(&track, |_| {}, &CancellationToken::new()).await;

        assert_eq!(summary.invoked, 3);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }
}
