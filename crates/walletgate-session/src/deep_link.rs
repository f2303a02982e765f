//! Deep-link delivery.
//!
//! A deep link sits in the session store until the lifecycle gate opens.
//! Links that carry no invitation marker are cleared straight away.
//! Everything else is resolved exactly once and then cleared, whether
//! resolution succeeded or not. Failures go to the global error channel
//! because no screen owns the interaction.

use std::sync::Arc;

use walletgate_connect::agent::InvitationOptions;
use walletgate_connect::navigation::Navigator;
use walletgate_connect::orchestrator::ConnectionOrchestrator;
use walletgate_types::{ErrorReport, NavigationTarget, SessionAction, WalletgateError};

use crate::error_sink::ErrorSink;
use crate::store::SessionStore;

/// Substrings of which at least one must appear in a link worth resolving.
const INVITATION_MARKERS: [&str; 4] = ["oob=", "c_i=", "d_m=", "url="];

/// Whether `link` carries any invitation marker.
pub fn has_invitation_marker(link: &str) -> bool {
    INVITATION_MARKERS.iter().any(|m| link.contains(m))
}

/// Result of one [`DeepLinkHandler::process`] call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeepLinkOutcome {
    /// No link pending.
    Idle,
    /// A link is pending but the gate is closed; it stays in the store.
    Held,
    /// The link had no invitation marker and was cleared.
    Inert,
    /// The link resolved and navigation was requested.
    Delivered(NavigationTarget),
    /// The link failed to resolve; the report was published.
    Failed(ErrorReport),
}

/// Delivers the store's pending deep link when allowed.
pub struct DeepLinkHandler {
    orchestrator: ConnectionOrchestrator,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    errors: Arc<dyn ErrorSink>,
    options: InvitationOptions,
}

impl DeepLinkHandler {
    /// Creates a handler. `options` is forwarded to the agent.
    pub fn new(
        orchestrator: ConnectionOrchestrator,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        errors: Arc<dyn ErrorSink>,
        options: InvitationOptions,
    ) -> Self {
        Self {
            orchestrator,
            store,
            navigator,
            errors,
            options,
        }
    }

    /// Processes the pending link, if any.
    ///
    /// `gate_open` is the lifecycle monitor's verdict on whether links
    /// may be delivered right now.
    pub async fn process(&self, gate_open: bool) -> DeepLinkOutcome {
        let Some(link) = self.store.deep_link() else {
            return DeepLinkOutcome::Idle;
        };

        if !has_invitation_marker(&link) {
            tracing::debug!("deep link has no invitation marker, clearing");
            self.clear();
            return DeepLinkOutcome::Inert;
        }

        if !gate_open {
            tracing::debug!("deep link held until the session is unlocked");
            return DeepLinkOutcome::Held;
        }

        tracing::info!(link = %link, "handling deep link");
        let outcome = match self.orchestrator.connect(&link, &self.options).await {
            Ok(resolved) => {
                let target = resolved.navigation_target();
                self.navigator.navigate(target.clone());
                DeepLinkOutcome::Delivered(target)
            }
            Err(e) => {
                let detail = e.to_string();
                let wrapped = WalletgateError::DeepLinkFailure {
                    reason: detail.clone(),
                };
                tracing::warn!(%wrapped, cause_code = ?e.code(), "deep link failed");
                let report = ErrorReport::new(&wrapped, detail);
                self.errors.report(report.clone());
                DeepLinkOutcome::Failed(report)
            }
        };

        self.clear();
        outcome
    }

    fn clear(&self) {
        self.store.dispatch(SessionAction::SetActiveDeepLink(None));
    }
}
