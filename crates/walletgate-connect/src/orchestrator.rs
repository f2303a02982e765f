//! Drives an invitation from raw string to navigable result.
//!
//! # Steps
//!
//! 1. Reject values that cannot be decoded.
//! 2. Classify the raw value (redirect or direct).
//! 3. Resolve it through the agent.
//! 4. Return the discriminated [`ResolvedInvitation`].
//!
//! Scan callers get failures translated into a [`ScanError`] that carries
//! the scanned string, so the scan gate can block that value for the rest
//! of the session.

use std::sync::Arc;

use walletgate_types::{ResolvedInvitation, Result, ScanError, ScanEvent};

use crate::agent::{Agent, InvitationOptions};
use crate::resolver::{check_payload, classify, InvitationKind, InvitationResolver};

/// Resolves scanned or linked invitations.
#[derive(Clone)]
pub struct ConnectionOrchestrator {
    resolver: InvitationResolver,
}

impl ConnectionOrchestrator {
    /// Creates an orchestrator backed by `agent`.
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            resolver: InvitationResolver::new(agent),
        }
    }

    /// Resolves one camera scan.
    ///
    /// # Errors
    ///
    /// A [`ScanError`] whose `source_data` is the scanned value and whose
    /// `code` is the failing stage's code.
    pub async fn handle(
        &self,
        event: &ScanEvent,
    ) -> std::result::Result<ResolvedInvitation, ScanError> {
        self.connect(&event.value, &InvitationOptions::default())
            .await
            .map_err(|e| {
                tracing::warn!(%e, code = ?e.code(), "scanned invitation failed to resolve");
                ScanError::from_failure(&e, event.value.as_str())
            })
    }

    /// Classifies and resolves `raw` without scan-specific translation.
    ///
    /// # Errors
    ///
    /// - `WalletgateError::DecodeFailure` if `raw` is not decodable.
    /// - `WalletgateError::RedirectFailure` if the redirect fetch fails.
    /// - `WalletgateError::InvitationFailure` if the agent rejects the
    ///   invitation.
    pub async fn connect(
        &self,
        raw: &str,
        options: &InvitationOptions,
    ) -> Result<ResolvedInvitation> {
        check_payload(raw)?;
        let kind = classify(raw);
        tracing::debug!(?kind, deep_link = options.is_deep_link, "resolving invitation");

        match kind {
            InvitationKind::Redirect => {
                let thread_id = self.resolver.resolve_redirect(raw).await?;
                tracing::info!(%thread_id, "redirect resolved");
                Ok(ResolvedInvitation::Redirect { thread_id })
            }
            InvitationKind::Direct => {
                let connection_id = self.resolver.resolve_direct(raw, options).await?;
                tracing::info!(%connection_id, "invitation accepted");
                Ok(ResolvedInvitation::Direct { connection_id })
            }
        }
    }
}
