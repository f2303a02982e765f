//! Scan screen driver.
//!
//! Wires the [`ScanGate`], the [`ConnectionOrchestrator`] and the
//! [`Navigator`] together for one visit to the scan screen.

use std::sync::Arc;

use walletgate_types::config::SessionConfig;
use walletgate_types::{NavigationTarget, ScanError, ScanEvent};

use crate::navigation::Navigator;
use crate::orchestrator::ConnectionOrchestrator;
use crate::scan_gate::{CameraState, CaptureDevice, ScanAction, ScanGate};

/// What happened to one decoded value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScanOutcome {
    /// The gate dropped the value.
    Ignored,
    /// The gate dropped the value and re-enabled the camera.
    Reactivated,
    /// The value resolved and navigation was requested.
    Navigated(NavigationTarget),
    /// The value failed to resolve.
    Failed(ScanError),
}

/// State of one scan screen visit.
pub struct ScanSession<D> {
    gate: ScanGate<D>,
    orchestrator: ConnectionOrchestrator,
    navigator: Arc<dyn Navigator>,
    current_error: Option<ScanError>,
}

impl<D: CaptureDevice> ScanSession<D> {
    /// Creates a session for a freshly mounted scan screen.
    pub fn new(
        device: D,
        config: &SessionConfig,
        orchestrator: ConnectionOrchestrator,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            gate: ScanGate::new(device, config),
            orchestrator,
            navigator,
            current_error: None,
        }
    }

    /// Handles one value decoded by the camera.
    pub async fn on_code_scanned(&mut self, code: &str) -> ScanOutcome {
        match self.gate.submit(code) {
            ScanAction::Ignore => ScanOutcome::Ignored,
            ScanAction::ReactivateAndIgnore => ScanOutcome::Reactivated,
            ScanAction::Process => {
                self.current_error = None;
                let event = ScanEvent::now(code);

                match self.orchestrator.handle(&event).await {
                    Ok(resolved) => {
                        let target = resolved.navigation_target();
                        tracing::info!(%target, "scan resolved, navigating");
                        self.navigator.navigate(target.clone());
                        ScanOutcome::Navigated(target)
                    }
                    Err(err) => {
                        self.current_error = Some(err.clone());
                        self.gate.record_failure(err.clone());
                        ScanOutcome::Failed(err)
                    }
                }
            }
        }
    }

    /// Error to show under the viewfinder, if any.
    pub fn current_error(&self) -> Option<&ScanError> {
        self.current_error.as_ref()
    }

    /// Current camera state.
    pub fn camera_state(&self) -> CameraState {
        self.gate.camera_state()
    }
}
