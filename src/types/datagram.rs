//! Decoded telemetry sample

use serde::{Deserialize, Serialize};

/// One decoded telemetry sample.
///
/// Fields missing from the active [`Schema`](super::Schema) stay at zero. That
/// zero is a sentinel, not a measurement: check `Schema::has_field` before
/// trusting a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datagram {
    /// Simulation time in seconds
    pub timestamp: f32,
    /// World coordinates X, Y (vertical), Z
    pub position: [f32; 3],
    /// Quaternion X, Y, Z, W
    pub attitude: [f32; 4],
    /// World space velocity in m/s
    pub velocity: [f32; 3],
    /// Angular rates pitch, roll, yaw in deg/s
    pub gyro: [f32; 3],
    /// Throttle, yaw, pitch, roll
    pub input: [f32; 4],
    /// Remaining voltage and charge percentage
    pub battery: [f32; 2],
    /// RPM per motor; the length is the count byte on the wire
    pub motor_rpm: Vec<f32>,
}

impl Datagram {
    /// Sample at `timestamp` with the given position and everything else zeroed.
    pub fn at(timestamp: f32, position: [f32; 3]) -> Self {
        Self { timestamp, position, ..Self::default() }
    }

    /// Horizontal distance to `other`. The vertical (second) coordinate is ignored.
    pub fn planar_distance(&self, other: &Datagram) -> f64 {
        let dx = f64::from(self.position[0]) - f64::from(other.position[0]);
        let dz = f64::from(self.position[2]) - f64::from(other.position[2]);
        (dx * dx + dz * dz).sqrt()
    }

    /// True when all three coordinates are exactly zero.
    ///
    /// The simulator parks telemetry at the origin between races, so this is an
    /// idle signal rather than a location.
    pub fn is_zero_position(&self) -> bool {
        self.position.iter().all(|c| *c == 0.0)
    }

    /// Largest absolute velocity component.
    pub fn max_velocity_component(&self) -> f32 {
        self.velocity.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()))
    }

    pub fn motor_count(&self) -> usize {
        self.motor_rpm.len()
    }
}
