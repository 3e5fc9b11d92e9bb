//! Session and lap segmentation of a live telemetry stream.
//!
//! [`SessionTracker`] is a single-writer state machine fed one decoded sample
//! at a time, in arrival order. It has two phases:
//!
//! - **Active**: samples accumulate into the open session and lap
//! - **Reported**: the last session was finalized; parked samples (all-zero
//!   position) are discarded until real data resumes
//!
//! Transitions are driven by three guards:
//!
//! - [`timestamp_regressed`]: the simulation clock went backwards (race restarted)
//! - [`parked_pair`]: two consecutive parked samples (race finished)
//! - [`loop_closed`]: back near the start after a path much longer than the
//!   furthest excursion (lap completed)
//!
//! Heuristics never fail. When the schema lacks position or velocity the
//! corresponding accumulators and guards are skipped.

mod episode;
mod sink;

pub use episode::{Episode, EpisodeKind, EpisodeReport};
pub use sink::{LogSink, ReportSink};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::types::{Datagram, FieldKind, Schema};
use episode::Available;

/// Numeric parameters of the segmentation heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Process only every Nth event; 0 or 1 processes all
    pub downsample_stride: u32,
    /// Distance from the session start that counts as "back at the start"
    pub lap_return_radius: f64,
    /// Minimum lap path length before a lap can close
    pub lap_min_trip: f64,
    /// Path length to excursion ratio a closed loop must exceed
    pub lap_loop_ratio: f64,
    /// Added to the measured ratio before comparing with `lap_loop_ratio`
    pub lap_ratio_bias: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            downsample_stride: 0,
            lap_return_radius: 3.0,
            lap_min_trip: 100.0,
            lap_loop_ratio: 2.0,
            lap_ratio_bias: 0.1,
        }
    }
}

/// Tracker phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    Reported,
}

/// What the tracker did with a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Counted but skipped by the downsample stride
    Downsampled,
    /// Counted but discarded while waiting for data to resume
    Idle,
    /// Folded into the session (and possibly finalized an episode)
    Accepted,
}

/// The simulation clock went backwards.
pub fn timestamp_regressed(previous: &Datagram, current: &Datagram) -> bool {
    previous.timestamp > current.timestamp
}

/// Two consecutive samples parked at the origin.
pub fn parked_pair(previous: &Datagram, current: &Datagram) -> bool {
    previous.is_zero_position() && current.is_zero_position()
}

/// Back within the return radius after a path long enough, relative to the
/// furthest excursion, to be a loop rather than an out-and-back.
pub fn loop_closed(distance_from_start: f64, lap: &Episode, config: &TrackerConfig) -> bool {
    distance_from_start < config.lap_return_radius
        && lap.trip_distance > config.lap_min_trip
        && lap.trip_distance / lap.max_distance + config.lap_ratio_bias > config.lap_loop_ratio
}

/// Segments samples into sessions and laps.
pub struct SessionTracker {
    config: TrackerConfig,
    schema: Arc<Schema>,
    available: Available,
    phase: Phase,
    session: Episode,
    lap: Episode,
    /// First sample of the open session
    origin: Option<Datagram>,
    previous: Option<Datagram>,
}

impl SessionTracker {
    pub fn new(schema: Arc<Schema>, config: TrackerConfig) -> Self {
        let available = Available {
            timestamp: schema.has_field(FieldKind::Timestamp),
            position: schema.has_field(FieldKind::Position),
            velocity: schema.has_field(FieldKind::Velocity),
        };
        Self {
            config,
            schema,
            available,
            phase: Phase::Active,
            session: Episode::new(EpisodeKind::Session, 1),
            lap: Episode::new(EpisodeKind::Lap, 1),
            origin: None,
            previous: None,
        }
    }

    /// Feed one sample in arrival order. Finalized episodes go to `sink`.
    pub fn observe(&mut self, sample: &Datagram, sink: &mut dyn ReportSink) -> Disposition {
        self.session.events += 1;
        self.lap.events += 1;

        let stride = u64::from(self.config.downsample_stride);
        if stride > 1 && (self.session.events - 1) % stride != 0 {
            return Disposition::Downsampled;
        }

        if self.phase == Phase::Reported {
            if self.is_parked(sample) {
                trace!(events = self.session.events, "Parked sample ignored after report");
                return Disposition::Idle;
            }
            self.resume();
        }

        let origin = self.origin.get_or_insert_with(|| sample.clone()).clone();
        let previous = self.previous.take();
        self.session.accumulate(sample, &origin, previous.as_ref(), self.available);
        self.lap.accumulate(sample, &origin, previous.as_ref(), self.available);

        if let Some(previous) = previous.as_ref() {
            if self.restart_triggered(previous, sample) {
                self.restart(sample, sink);
                self.previous = Some(sample.clone());
                return Disposition::Accepted;
            }
        }

        let distance_from_start = sample.planar_distance(&origin);
        if self.available.position && loop_closed(distance_from_start, &self.lap, &self.config) {
            self.complete_lap(sink);
        }

        self.previous = Some(sample.clone());
        Disposition::Accepted
    }

    /// Finalize the open session, if any. Call when the stream ends.
    pub fn finish(&mut self, sink: &mut dyn ReportSink) -> Option<EpisodeReport> {
        if self.phase == Phase::Reported {
            return None;
        }
        let report = self.session.report(self.session.index);
        sink.report(report.clone());
        self.phase = Phase::Reported;
        Some(report)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &Episode {
        &self.session
    }

    pub fn lap(&self) -> &Episode {
        &self.lap
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn is_parked(&self, sample: &Datagram) -> bool {
        self.available.position && sample.is_zero_position()
    }

    fn restart_triggered(&self, previous: &Datagram, current: &Datagram) -> bool {
        (self.available.timestamp && timestamp_regressed(previous, current))
            || (self.available.position && parked_pair(previous, current))
    }

    /// Data resumed after a report: the session that idled is discarded and a
    /// fresh one starts under the same index. Its event count restarts at zero,
    /// so the resuming sample itself is not counted.
    ///
    /// After a restart the restart sample stays the origin and previous sample,
    /// so the next sample is still checked against it. After a parked finish
    /// both are dropped and the next real sample becomes the origin.
    fn resume(&mut self) {
        let index = self.session.index;
        debug!(session = index, "Telemetry resumed, starting fresh session");

        self.session = Episode::new(EpisodeKind::Session, index);
        self.lap = Episode::new(EpisodeKind::Lap, 1);
        if self.previous.as_ref().is_some_and(|previous| self.is_parked(previous)) {
            self.origin = None;
            self.previous = None;
        }
        self.phase = Phase::Active;
    }

    fn restart(&mut self, sample: &Datagram, sink: &mut dyn ReportSink) {
        let index = self.session.index;
        debug!(session = index, timestamp = sample.timestamp, "Restart detected");

        sink.report(self.session.report(index));

        self.session = Episode::new(EpisodeKind::Session, index + 1);
        self.lap = Episode::new(EpisodeKind::Lap, 1);
        self.origin = Some(sample.clone());
        self.phase = Phase::Reported;
    }

    fn complete_lap(&mut self, sink: &mut dyn ReportSink) {
        let session = self.session.index;
        let lap = self.lap.index;
        debug!(session, lap, trip = self.lap.trip_distance, "Lap completed");

        sink.report(self.lap.report(session));
        self.lap = Episode::new(EpisodeKind::Lap, lap + 1);
    }
}
