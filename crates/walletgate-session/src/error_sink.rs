//! Global error channel.
//!
//! Failures that happen with no screen owning the interaction (deep
//! links) are surfaced here instead of inline.

use tokio::sync::mpsc;
use walletgate_types::ErrorReport;

/// Accepts error reports for display outside any screen.
pub trait ErrorSink: Send + Sync {
    /// Publishes `report`.
    fn report(&self, report: ErrorReport);
}

impl ErrorSink for mpsc::UnboundedSender<ErrorReport> {
    fn report(&self, report: ErrorReport) {
        if self.send(report).is_err() {
            tracing::warn!("error channel closed, report dropped");
        }
    }
}
