//! Destinations for finalized episode reports

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::EpisodeReport;

/// Receives session and lap summaries as they are finalized.
pub trait ReportSink {
    fn report(&mut self, report: EpisodeReport);
}

impl ReportSink for Vec<EpisodeReport> {
    fn report(&mut self, report: EpisodeReport) {
        self.push(report);
    }
}

impl ReportSink for mpsc::UnboundedSender<EpisodeReport> {
    fn report(&mut self, report: EpisodeReport) {
        if self.send(report).is_err() {
            debug!("Report receiver dropped, discarding report");
        }
    }
}

/// Sink that only writes reports to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn report(&mut self, report: EpisodeReport) {
        info!(
            kind = %report.kind,
            index = report.index,
            session = report.session_index,
            events = report.events,
            "{}",
            report
        );
    }
}
