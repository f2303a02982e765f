//! Commands and status types for UI → session communication.
//!
//! [`SessionCommand`] is the bounded-channel message type that platform
//! glue, the simulator and tests use to drive a wallet session. Commands
//! that produce a result carry a `tokio::sync::oneshot::Sender` for the
//! reply.
//!
//! Commands are processed one at a time inside the event loop, so the
//! lifecycle state has a single writer.

use tokio::sync::oneshot;
use walletgate_types::{OsAppState, SessionPhase};

use crate::session::SessionState;

// ---------------------------------------------------------------------------
// SessionCommand
// ---------------------------------------------------------------------------

/// Commands accepted by the session event loop.
pub enum SessionCommand {
    /// The OS reported a new app state.
    AppStateChanged(OsAppState),

    /// A pending navigation transition finished.
    NavigationSettled,

    /// The user passed the authentication screen.
    ///
    /// Marks the store authenticated and unlocks a locked session.
    Authenticated,

    /// The OS handed the app a deep link.
    ///
    /// The link replaces any link still pending.
    DeepLinkOpened(String),

    /// Query the current session status.
    GetStatus {
        /// Reply channel for the status snapshot.
        reply: oneshot::Sender<SessionStatus>,
    },

    /// Stop the event loop.
    ///
    /// Fire-and-forget; await the `JoinHandle` returned by
    /// [`WalletSession::start`](crate::session::WalletSession::start)
    /// to confirm completion.
    Shutdown,
}

// Manual Debug because oneshot::Sender does not implement Debug.
impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AppStateChanged(state) => {
                f.debug_tuple("AppStateChanged").field(state).finish()
            }
            Self::NavigationSettled => f.write_str("NavigationSettled"),
            Self::Authenticated => f.write_str("Authenticated"),
            Self::DeepLinkOpened(_) => f.write_str("DeepLinkOpened(..)"),
            Self::GetStatus { .. } => f.write_str("GetStatus"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Snapshot of the session, returned by [`SessionCommand::GetStatus`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionStatus {
    /// Runtime state.
    pub state: SessionState,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Last OS app state accepted by the monitor.
    pub os_state: OsAppState,
    /// Whether deep links and pickup are suspended.
    pub suspended: bool,
    /// Store authentication flag.
    pub authenticated: bool,
    /// Deep link waiting for delivery, if any.
    pub pending_deep_link: Option<String>,
}
