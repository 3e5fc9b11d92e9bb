//! Telemetry field kinds and their wire widths

use serde::{Deserialize, Serialize};

/// Size of one IEEE-754 single precision value on the wire.
pub const FLOAT32: usize = 4;

/// Size of the motor count prefix of a motor array.
pub const BYTE: usize = 1;

/// Motor count assumed when sizing blocks before decoding.
///
/// The decoder reads the real count from the stream, so blocks from airframes
/// with a different motor count are longer or shorter than [`Schema::block_length`].
///
/// [`Schema::block_length`]: super::Schema::block_length
pub const ASSUMED_MOTOR_COUNT: usize = 4;

/// Kinds of field a telemetry block can carry.
/// Names match the simulator's `StreamFormat` tokens exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Simulation time in seconds (1 float)
    Timestamp,
    /// World position X, Y, Z (3 floats)
    Position,
    /// Orientation quaternion X, Y, Z, W (4 floats)
    Attitude,
    /// World space velocity in m/s (3 floats)
    Velocity,
    /// Angular rates pitch, roll, yaw in deg/s (3 floats)
    Gyro,
    /// Stick input throttle, yaw, pitch, roll (4 floats)
    Input,
    /// Voltage and charge percentage (2 floats)
    Battery,
    /// Motor count byte followed by that many RPM floats
    MotorArray,
    /// A configured token this crate does not recognise. Occupies no bytes.
    Unknown,
}

impl FieldKind {
    /// The eight recognised kinds in the simulator's canonical order.
    pub const KNOWN: [FieldKind; 8] = [
        FieldKind::Timestamp,
        FieldKind::Position,
        FieldKind::Attitude,
        FieldKind::Velocity,
        FieldKind::Gyro,
        FieldKind::Input,
        FieldKind::Battery,
        FieldKind::MotorArray,
    ];

    /// Map a configured token to a kind. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Timestamp" => FieldKind::Timestamp,
            "Position" => FieldKind::Position,
            "Attitude" => FieldKind::Attitude,
            "Velocity" => FieldKind::Velocity,
            "Gyro" => FieldKind::Gyro,
            "Input" => FieldKind::Input,
            "Battery" => FieldKind::Battery,
            "MotorRPM" => FieldKind::MotorArray,
            _ => FieldKind::Unknown,
        }
    }

    /// Token used for this kind in configuration and track headers.
    pub const fn name(&self) -> &'static str {
        match self {
            FieldKind::Timestamp => "Timestamp",
            FieldKind::Position => "Position",
            FieldKind::Attitude => "Attitude",
            FieldKind::Velocity => "Velocity",
            FieldKind::Gyro => "Gyro",
            FieldKind::Input => "Input",
            FieldKind::Battery => "Battery",
            FieldKind::MotorArray => "MotorRPM",
            FieldKind::Unknown => "Unknown",
        }
    }

    /// Number of floats in a fixed-width field.
    pub const fn float_count(&self) -> usize {
        match self {
            FieldKind::Timestamp => 1,
            FieldKind::Battery => 2,
            FieldKind::Position | FieldKind::Velocity | FieldKind::Gyro => 3,
            FieldKind::Attitude | FieldKind::Input => 4,
            FieldKind::MotorArray | FieldKind::Unknown => 0,
        }
    }

    /// Exact encoded width, or `None` when it is only known while decoding.
    pub const fn width(&self) -> Option<usize> {
        match self {
            FieldKind::MotorArray => None,
            other => Some(other.float_count() * FLOAT32),
        }
    }

    /// Width used for block sizing. Motor arrays assume [`ASSUMED_MOTOR_COUNT`] motors.
    pub const fn sizing_width(&self) -> usize {
        match self {
            FieldKind::MotorArray => BYTE + ASSUMED_MOTOR_COUNT * FLOAT32,
            other => other.float_count() * FLOAT32,
        }
    }

    /// Width of a motor array carrying `count` motors.
    pub const fn motor_array_width(count: usize) -> usize {
        BYTE + count * FLOAT32
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
