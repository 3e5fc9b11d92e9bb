//! Test utilities for synthetic telemetry
//!
//! Builders for samples, closed-loop flight paths and encoded track images that
//! are shared by unit tests and benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::Arc;

use crate::codec;
use crate::provider::Provider;
use crate::track::Track;
use crate::types::{Datagram, FramePacket, Schema};

/// Sample at `timestamp` positioned at `(x, 0, z)`.
///
/// `sample(t, 0.0, 0.0)` is a parked sample.
pub fn sample(timestamp: f32, x: f32, z: f32) -> Datagram {
    Datagram::at(timestamp, [x, 0.0, z])
}

/// Sample with every field populated and four motors, so it fills a full block.
pub fn full_sample(timestamp: f32) -> Datagram {
    Datagram {
        timestamp,
        position: [12.5, 3.25, -40.0],
        attitude: [0.0, 0.7071, 0.0, 0.7071],
        velocity: [8.5, -0.5, 2.0],
        gyro: [15.0, -3.5, 90.0],
        input: [0.75, 0.0, -0.25, 0.1],
        battery: [15.9, 0.82],
        motor_rpm: vec![4500.0, 4520.0, 4480.0, 4510.0],
    }
}

/// Points around a horizontal circle, one per degree starting at angle zero,
/// 10 ms apart.
///
/// The path starts at `center + (radius, 0, 0)`, so sample `i` is `i` degrees
/// along the loop.
pub fn circle_samples(center: [f32; 3], radius: f32, count: usize) -> Vec<Datagram> {
    (0..count)
        .map(|i| {
            let angle = (i as f64).to_radians();
            let x = center[0] as f64 + radius as f64 * angle.cos();
            let z = center[2] as f64 + radius as f64 * angle.sin();
            let speed = radius as f64 * 1.0_f64.to_radians() / 0.01;
            Datagram {
                velocity: [(-speed * angle.sin()) as f32, 0.0, (speed * angle.cos()) as f32],
                ..Datagram::at(i as f32 * 0.01, [x as f32, center[1], z as f32])
            }
        })
        .collect()
}

/// Binary track file image: header line plus encoded blocks.
pub fn encoded_track(schema: &Schema, samples: &[Datagram]) -> Vec<u8> {
    let mut data = schema.header_line().into_bytes();
    data.push(b'\n');
    for sample in samples {
        if let Err(e) = codec::encode_into(schema, sample, &mut data) {
            panic!("synthetic sample does not encode: {}", e);
        }
    }
    data
}

/// Track with the given timestamps, each sample parked one unit from the origin.
pub fn timestamps_track(timestamps: &[f32]) -> Track {
    let schema = Arc::new(Schema::resolve(["Timestamp", "Position"]));
    let samples = timestamps.iter().map(|&t| sample(t, 1.0, 1.0)).collect();
    Track::from_samples(schema, samples)
}

/// Track of `count` samples spaced `step` seconds apart, starting at zero.
pub fn timed_track(count: usize, step: f32) -> Track {
    let timestamps: Vec<f32> = (0..count).map(|i| i as f32 * step).collect();
    timestamps_track(&timestamps)
}

/// Provider whose transport never delivers anything.
pub struct PendingProvider {
    schema: Arc<Schema>,
}

impl PendingProvider {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }
}

#[async_trait::async_trait]
impl Provider for PendingProvider {
    async fn next_block(&mut self) -> crate::Result<Option<FramePacket>> {
        futures::future::pending().await
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_returns_to_its_start() {
        let samples = circle_samples([0.0, 5.0, 0.0], 20.0, 361);
        assert!(samples[0].planar_distance(&samples[360]) < 1e-3);
        assert!((samples[0].planar_distance(&samples[180]) - 40.0).abs() < 1e-3);
        assert!(samples.iter().all(|s| !s.is_zero_position()));
    }

    #[test]
    fn full_sample_fills_a_full_block() {
        let bytes = codec::encode(&Schema::full(), &full_sample(1.0)).expect("encode");
        assert_eq!(bytes.len(), Schema::full().block_length());
    }
}
