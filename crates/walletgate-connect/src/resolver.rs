//! Invitation classification and resolution.
//!
//! [`check_payload`] and [`classify`] are purely syntactic and never
//! touch the network. The two `resolve_*` calls go through the agent
//! and wrap its failures in coded errors. No retries are performed here.

use std::sync::Arc;

use url::form_urlencoded;
use walletgate_types::{ConnectionId, Result, ThreadId, WalletgateError};

use crate::agent::{Agent, InvitationOptions};

/// Query parameters that carry an invitation inline.
const INVITATION_PARAMS: [&str; 3] = ["c_i", "d_m", "oob"];

// ---------------------------------------------------------------------------
// InvitationKind
// ---------------------------------------------------------------------------

/// How a raw scanned or linked string must be resolved.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InvitationKind {
    /// Must be dereferenced to obtain the protocol message.
    Redirect,
    /// Carries the invitation itself.
    Direct,
}

/// Rejects values that cannot be an invitation at all.
///
/// # Errors
///
/// `WalletgateError::DecodeFailure` if `raw` is blank or contains
/// control characters.
pub fn check_payload(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(WalletgateError::DecodeFailure {
            reason: "payload is blank".into(),
        });
    }
    if raw.chars().any(char::is_control) {
        return Err(WalletgateError::DecodeFailure {
            reason: "payload contains control characters".into(),
        });
    }
    Ok(())
}

/// Classifies `raw` as a redirect or a direct invitation.
///
/// A value is a direct invitation iff its query string carries a
/// non-empty `c_i`, `d_m` or `oob` parameter.
pub fn classify(raw: &str) -> InvitationKind {
    let Some((_, query)) = raw.split_once('?') else {
        return InvitationKind::Redirect;
    };
    let query = query.split_once('#').map_or(query, |(q, _)| q);

    let direct = form_urlencoded::parse(query.as_bytes())
        .any(|(key, value)| INVITATION_PARAMS.contains(&key.as_ref()) && !value.is_empty());

    if direct {
        InvitationKind::Direct
    } else {
        InvitationKind::Redirect
    }
}

// ---------------------------------------------------------------------------
// InvitationResolver
// ---------------------------------------------------------------------------

/// Resolves classified invitations through the agent.
#[derive(Clone)]
pub struct InvitationResolver {
    agent: Arc<dyn Agent>,
}

impl InvitationResolver {
    /// Creates a resolver backed by `agent`.
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }

    /// Fetches the message behind a redirect and returns its id.
    ///
    /// # Errors
    ///
    /// `WalletgateError::RedirectFailure` (code 1030) wrapping whatever
    /// the agent reported.
    pub async fn resolve_redirect(&self, raw: &str) -> Result<ThreadId> {
        let message = self
            .agent
            .fetch_redirected_message(raw)
            .await
            .map_err(|e| WalletgateError::RedirectFailure {
                reason: e.to_string(),
            })?;
        Ok(ThreadId::new(message.id))
    }

    /// Accepts a direct invitation and returns the connection id.
    ///
    /// # Errors
    ///
    /// `WalletgateError::InvitationFailure` (code 1031) wrapping whatever
    /// the agent reported.
    pub async fn resolve_direct(
        &self,
        raw: &str,
        options: &InvitationOptions,
    ) -> Result<ConnectionId> {
        let record = self
            .agent
            .receive_invitation(raw, options)
            .await
            .map_err(|e| WalletgateError::InvitationFailure {
                reason: e.to_string(),
            })?;
        Ok(ConnectionId::new(record.id))
    }
}
