//! Session and lap accumulators

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime};

use crate::types::Datagram;

/// What an episode represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpisodeKind {
    /// One continuous run from start until a restart trigger
    Session,
    /// One loop within a session, closed by returning near the start
    Lap,
}

impl std::fmt::Display for EpisodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpisodeKind::Session => f.write_str("Session"),
            EpisodeKind::Lap => f.write_str("Lap"),
        }
    }
}

/// Which optional fields the accumulators may trust.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Available {
    pub timestamp: bool,
    pub position: bool,
    pub velocity: bool,
}

/// Running statistics for a session or a lap.
#[derive(Debug, Clone)]
pub struct Episode {
    pub kind: EpisodeKind,
    /// 1-based index; laps count within their session
    pub index: u32,
    /// Wall clock start
    pub started_at: Instant,
    /// Samples counted, including downsampled and idle ones
    pub events: u64,
    /// Largest planar distance from the session's first sample
    pub max_distance: f64,
    /// Largest absolute velocity component seen, m/s
    pub max_velocity: f32,
    /// Planar path length
    pub trip_distance: f64,
    /// Simulation time of the first accumulated sample
    pub first_timestamp: Option<f32>,
    /// Simulation time of the latest accumulated sample
    pub last_timestamp: Option<f32>,
}

impl Episode {
    pub fn new(kind: EpisodeKind, index: u32) -> Self {
        Self {
            kind,
            index,
            started_at: Instant::now(),
            events: 0,
            max_distance: 0.0,
            max_velocity: 0.0,
            trip_distance: 0.0,
            first_timestamp: None,
            last_timestamp: None,
        }
    }

    /// Fold one sample into the running statistics.
    pub(crate) fn accumulate(
        &mut self,
        sample: &Datagram,
        origin: &Datagram,
        previous: Option<&Datagram>,
        available: Available,
    ) {
        if available.timestamp {
            self.first_timestamp.get_or_insert(sample.timestamp);
            self.last_timestamp = Some(sample.timestamp);
        }

        if available.position {
            self.max_distance = self.max_distance.max(sample.planar_distance(origin));
            if let Some(previous) = previous {
                self.trip_distance += sample.planar_distance(previous);
            }
        }

        if available.velocity {
            self.max_velocity = self.max_velocity.max(sample.max_velocity_component());
        }
    }

    /// Close the episode and produce its summary, stamped with the current time.
    pub fn report(&self, session_index: u32) -> EpisodeReport {
        EpisodeReport {
            kind: self.kind,
            index: self.index,
            session_index,
            ended_at: SystemTime::now(),
            duration: self.started_at.elapsed(),
            events: self.events,
            trip_distance: self.trip_distance,
            max_velocity: self.max_velocity,
            max_distance: self.max_distance,
            first_timestamp: self.first_timestamp.unwrap_or_default(),
            last_timestamp: self.last_timestamp.unwrap_or_default(),
        }
    }
}

/// Summary of a finalized session or lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    pub kind: EpisodeKind,
    pub index: u32,
    /// Owning session; equals `index` for sessions
    pub session_index: u32,
    /// Wall clock time of finalization
    pub ended_at: SystemTime,
    /// Wall clock time from start to finalization
    pub duration: Duration,
    pub events: u64,
    pub trip_distance: f64,
    pub max_velocity: f32,
    pub max_distance: f64,
    pub first_timestamp: f32,
    pub last_timestamp: f32,
}

impl EpisodeReport {
    /// Simulation time covered by the accumulated samples.
    pub fn simulated_seconds(&self) -> f32 {
        self.last_timestamp - self.first_timestamp
    }
}

impl std::fmt::Display for EpisodeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.kind == EpisodeKind::Lap {
            write!(f, "Session #{} ", self.session_index)?;
        }
        write!(
            f,
            "{} #{}: {}s, {} events, total trip {:.1}, max velocity: {:.2} m/s, max from start: {:.1}",
            self.kind,
            self.index,
            self.duration.as_secs(),
            self.events,
            self.trip_distance,
            self.max_velocity,
            self.max_distance
        )
    }
}
