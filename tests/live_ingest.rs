//! Live ingestion over a loopback UDP socket.

use anyhow::{Context, Result, ensure};
use flightdeck::codec::encode;
use flightdeck::session::EpisodeKind;
use flightdeck::track::Track;
use flightdeck::{Datagram, Flightdeck, TelemetryConfig};
use futures::StreamExt;
use std::time::Duration;
use tokio::net::UdpSocket;

fn config(yaml: &str) -> Result<TelemetryConfig> {
    TelemetryConfig::from_yaml_str(yaml).context("parse test config")
}

#[tokio::test]
async fn restart_and_finish_are_reported() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let config = config(
        r#"{"EndPoint": "127.0.0.1:0", "StreamFormat": ["Timestamp", "Position", "Velocity"]}"#,
    )?;
    let schema = config.schema();
    let mut connection = Flightdeck::listen(&config).await?;
    let address = connection.local_addr().context("bound address")?;
    let mut reports = connection.take_reports().context("report stream")?;

    let flight = [
        Datagram::at(10.0, [5.0, 1.0, 5.0]),
        Datagram::at(10.1, [6.0, 1.0, 5.0]),
        Datagram::at(10.2, [8.0, 1.0, 5.0]),
        // Race finished: parked at the origin
        Datagram::at(10.3, [0.0, 0.0, 0.0]),
        Datagram::at(10.4, [0.0, 0.0, 0.0]),
        Datagram::at(10.5, [0.0, 0.0, 0.0]),
        // Next race
        Datagram::at(0.0, [5.0, 1.0, 5.0]),
    ];

    let sender = UdpSocket::bind("127.0.0.1:0").await?;
    for sample in &flight {
        sender.send_to(&encode(&schema, sample)?, address).await?;
    }

    let first = tokio::time::timeout(Duration::from_secs(5), reports.next())
        .await
        .context("restart report in time")?
        .context("report stream open")?;
    ensure!(first.kind == EpisodeKind::Session);
    ensure!(first.index == 1);
    ensure!(first.events == 5, "events up to the parked pair, got {}", first.events);
    ensure!((first.trip_distance - (3.0 + 8.0_f64.hypot(5.0))).abs() < 1e-3);

    // Wait for the resumed sample before stopping
    let mut updates = connection.sample_updates();
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(sample) = updates.next().await {
            if sample.sequence == flight.len() as u64 {
                break;
            }
        }
    })
    .await
    .context("all blocks ingested")?;

    let summary = connection.shutdown().await?;
    ensure!(summary.blocks == flight.len() as u64);
    ensure!(summary.idle == 1, "one parked sample after the report");
    ensure!(summary.sessions_reported == 2);

    let last = reports.next().await.context("final report")?;
    // The sample that resumed the session is not counted in it
    ensure!(last.kind == EpisodeKind::Session && last.index == 2 && last.events == 0);
    ensure!(last.trip_distance == 0.0, "the parked origin is not carried over");
    Ok(())
}

#[tokio::test]
async fn malformed_message_stops_the_listener() -> Result<()> {
    let config = config("endpoint: 127.0.0.1:0\nstream_format: [Timestamp, Position]\n")?;
    let connection = Flightdeck::listen(&config).await?;
    let address = connection.local_addr().context("bound address")?;

    let sender = UdpSocket::bind("127.0.0.1:0").await?;
    sender.send_to(&[1u8; 15], address).await?;

    let result = tokio::time::timeout(Duration::from_secs(5), connection.wait())
        .await
        .context("listener stops")?;
    match result {
        Err(flightdeck::TelemetryError::Protocol { details, .. }) => {
            ensure!(details == "expected 16 bytes, received 15");
        }
        other => anyhow::bail!("expected a protocol error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn recording_captures_live_samples() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let yaml = format!(
        "endpoint: 127.0.0.1:0\nstream_format: [Timestamp, Position]\nrecording:\n  directory: {}\n",
        dir.path().display()
    );
    let config = config(&yaml)?;
    let schema = config.schema();
    let connection = Flightdeck::listen(&config).await?;
    let address = connection.local_addr().context("bound address")?;

    let sender = UdpSocket::bind("127.0.0.1:0").await?;
    for i in 0..20 {
        let sample = Datagram::at(i as f32 * 0.05, [1.0 + i as f32, 2.0, 3.0]);
        sender.send_to(&encode(&schema, &sample)?, address).await?;
    }

    let mut updates = connection.sample_updates();
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(sample) = updates.next().await {
            if sample.sequence == 20 {
                break;
            }
        }
    })
    .await
    .context("all blocks ingested")?;

    let summary = connection.shutdown().await?;
    let path = summary.recording.context("recording path")?;
    let track = Track::open(&path)?;
    ensure!(track.len() == 20, "recorded {} samples", track.len());
    ensure!(track.schema().header_line() == "Timestamp,Position");
    Ok(())
}
