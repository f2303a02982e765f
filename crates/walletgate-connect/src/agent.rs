//! Contract for the agent/wallet SDK.
//!
//! The core never parses invitations, performs DID exchange or moves
//! messages itself. It calls into the SDK through [`Agent`] and treats
//! every call as fallible.

use async_trait::async_trait;
use walletgate_types::config::SessionConfig;
use walletgate_types::Result;

// ---------------------------------------------------------------------------
// Records returned by the agent
// ---------------------------------------------------------------------------

/// Connection record created when an invitation is accepted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectionRecord {
    /// Agent-assigned record id.
    pub id: String,
}

/// Protocol message obtained by dereferencing a redirect.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AgentMessage {
    /// The message's `@id`.
    pub id: String,
}

// ---------------------------------------------------------------------------
// InvitationOptions
// ---------------------------------------------------------------------------

/// Flags forwarded to [`Agent::receive_invitation`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InvitationOptions {
    /// The invitation arrived through a deep link rather than the camera.
    pub is_deep_link: bool,
    /// Accept implicit (public DID) invitations.
    pub implicit_invitations: bool,
    /// Reuse an existing connection with the same peer when possible.
    pub reuse_connections: bool,
}

impl InvitationOptions {
    /// Options for an invitation opened from a deep link.
    pub fn for_deep_link(config: &SessionConfig) -> Self {
        Self {
            is_deep_link: true,
            implicit_invitations: config.enable_implicit_invitations,
            reuse_connections: config.enable_reuse_connections,
        }
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Handle to the agent/wallet SDK.
///
/// Implementations must be shareable across tasks; the session runtime
/// and the scan flow hold the same handle.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Whether the agent has finished initializing.
    fn is_initialized(&self) -> bool;

    /// Accepts an invitation and returns the new connection record.
    async fn receive_invitation(
        &self,
        raw: &str,
        options: &InvitationOptions,
    ) -> Result<ConnectionRecord>;

    /// Fetches the message a redirect URL points to.
    async fn fetch_redirected_message(&self, raw: &str) -> Result<AgentMessage>;

    /// Closes the secure wallet store.
    async fn close_wallet(&self) -> Result<()>;

    /// Starts the mediator message pickup subscription.
    async fn start_message_pickup(&self) -> Result<()>;

    /// Stops the mediator message pickup subscription.
    async fn stop_message_pickup(&self) -> Result<()>;
}
