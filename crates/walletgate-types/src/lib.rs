//! Core shared types for the Walletgate session core.
//!
//! This crate defines the value types exchanged between the scan flow,
//! the session lifecycle monitor and the runtime. Collaborator traits
//! live next to the code that consumes them; everything that crosses a
//! crate boundary as plain data lives here.

pub mod config;

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Fixed numeric codes attached to failures that reach the user.
pub mod codes {
    /// Dereferencing a redirect invitation failed.
    pub const REDIRECT_FAILURE: u16 = 1030;
    /// Accepting a direct invitation through the agent failed.
    pub const INVITATION_FAILURE: u16 = 1031;
    /// Resolving an invitation that arrived as a deep link failed.
    pub const DEEP_LINK_FAILURE: u16 = 1039;
}

/// User-facing text shown when a scan fails without a specific code.
pub const GENERIC_SCAN_ERROR: &str = "Invalid QR code. Please try again.";

// ---------------------------------------------------------------------------
// ThreadId / ConnectionId
// ---------------------------------------------------------------------------

/// Identifier of the protocol message a redirect invitation pointed to.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ThreadId(String);

impl ThreadId {
    /// Creates a new `ThreadId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a connection record created by the agent.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Creates a new `ConnectionId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ScanEvent
// ---------------------------------------------------------------------------

/// Raw decoded payload of one camera scan or link activation.
///
/// Created per frame or link event and discarded once classified.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// The decoded string, exactly as the scanner produced it.
    pub value: String,
    /// Wall-clock time of the scan in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl ScanEvent {
    /// Creates a `ScanEvent` stamped with the current UTC time.
    pub fn now(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

// ---------------------------------------------------------------------------
// ResolvedInvitation / NavigationTarget
// ---------------------------------------------------------------------------

/// Successful terminal value of connection orchestration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ResolvedInvitation {
    /// A redirect was dereferenced into a protocol message.
    Redirect {
        /// Id of the fetched message.
        thread_id: ThreadId,
    },
    /// A direct invitation was accepted into a connection.
    Direct {
        /// Id of the resulting connection record.
        connection_id: ConnectionId,
    },
}

impl ResolvedInvitation {
    /// Maps the result onto the screen the UI should show next.
    ///
    /// Both variants land on the connection screen; only the key differs.
    pub fn navigation_target(&self) -> NavigationTarget {
        let key = match self {
            Self::Redirect { thread_id } => NavigationKey::ThreadId(thread_id.clone()),
            Self::Direct { connection_id } => {
                NavigationKey::ConnectionId(connection_id.clone())
            }
        };
        NavigationTarget {
            screen: Screen::Connection,
            key,
        }
    }
}

/// Destination screens the core can request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Screen {
    /// Connection progress screen.
    Connection,
}

/// Parameter identifying what the destination screen should display.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NavigationKey {
    /// Follow a message thread obtained from a redirect.
    ThreadId(ThreadId),
    /// Follow a connection record.
    ConnectionId(ConnectionId),
}

/// A navigation request handed to the UI collaborator.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NavigationTarget {
    /// Screen to open.
    pub screen: Screen,
    /// Parameter for that screen.
    pub key: NavigationKey,
}

impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            NavigationKey::ThreadId(id) => write!(f, "{:?}(thread_id={id})", self.screen),
            NavigationKey::ConnectionId(id) => {
                write!(f, "{:?}(connection_id={id})", self.screen)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ScanError
// ---------------------------------------------------------------------------

/// A failed scan, carrying the offending raw value.
///
/// `code` is `None` for a generic decode failure and `Some` when a
/// specific resolution stage failed.
#[derive(Clone, Debug, Eq, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ScanError {
    /// User-facing message.
    pub message: String,
    /// The scanned string that caused the failure.
    pub source_data: String,
    /// Numeric code of the failing stage, if any.
    pub code: Option<u16>,
}

impl ScanError {
    /// Builds a `ScanError` from a resolution failure.
    ///
    /// Coded failures expose their own description; anything else gets
    /// the generic invalid-code text.
    pub fn from_failure(err: &WalletgateError, source_data: impl Into<String>) -> Self {
        let code = err.code();
        let message = match code {
            Some(_) => err.description().to_string(),
            None => GENERIC_SCAN_ERROR.to_string(),
        };
        Self {
            message,
            source_data: source_data.into(),
            code,
        }
    }
}

// ---------------------------------------------------------------------------
// OsAppState
// ---------------------------------------------------------------------------

/// Application state as reported by the operating system.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsAppState {
    /// Visible and receiving input.
    Active,
    /// Transient state used while an OS prompt covers the app.
    Inactive,
    /// Not visible.
    Background,
}

impl OsAppState {
    /// Returns `true` for the two non-active states.
    pub fn is_away(self) -> bool {
        matches!(self, Self::Inactive | Self::Background)
    }
}

impl fmt::Display for OsAppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Background => write!(f, "background"),
        }
    }
}

impl FromStr for OsAppState {
    type Err = WalletgateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "background" => Ok(Self::Background),
            other => Err(WalletgateError::ConfigError {
                reason: format!("unknown app state '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Phase of the wallet session lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// In the foreground with an unlocked session.
    Foreground,
    /// Backgrounded; the lock timer is running.
    BackgroundTiming,
    /// Locked out; re-authentication required.
    Locked,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Foreground => write!(f, "foreground"),
            Self::BackgroundTiming => write!(f, "background_timing"),
            Self::Locked => write!(f, "locked"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionAction
// ---------------------------------------------------------------------------

/// Actions the core dispatches to the global session store.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SessionAction {
    /// Set the session authentication flag.
    SetAuthenticated(bool),
    /// Ask the UI to show the lockout notification.
    LockoutNotify,
    /// Replace the pending deep link (`None` marks it inactive).
    SetActiveDeepLink(Option<String>),
}

// ---------------------------------------------------------------------------
// ErrorReport
// ---------------------------------------------------------------------------

/// Payload of the global error channel.
///
/// Used for failures that originate outside an active screen.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Short headline.
    pub title: String,
    /// User-facing explanation.
    pub message: String,
    /// Underlying cause, for support.
    pub detail: String,
    /// Numeric error code.
    pub code: u16,
}

impl ErrorReport {
    /// Builds a report for a coded error, keeping `detail` as the cause.
    pub fn new(err: &WalletgateError, detail: impl Into<String>) -> Self {
        Self {
            title: err.title().to_string(),
            message: err.description().to_string(),
            detail: detail.into(),
            code: err.code().unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Events emitted by the session runtime to the UI layer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The lifecycle phase changed.
    PhaseChanged {
        /// Phase before the transition.
        from: SessionPhase,
        /// Phase after the transition.
        to: SessionPhase,
    },
    /// The session was locked out after too long in the background.
    LockedOut,
    /// A deep link was resolved and navigation requested.
    DeepLinkDelivered {
        /// Where the UI was sent.
        target: NavigationTarget,
    },
    /// A deep link without invitation markers was discarded.
    DeepLinkCleared,
    /// A deep link failed to resolve and was reported.
    DeepLinkFailed {
        /// Code of the reported error.
        code: u16,
    },
}

// ---------------------------------------------------------------------------
// WalletgateError
// ---------------------------------------------------------------------------

/// Central error type for the session core.
///
/// All crates in the workspace convert their failures into variants of
/// this enum. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum WalletgateError {
    /// The scanned payload could not be decoded at all.
    ///
    /// Carries no code; scans report it with the generic message.
    #[error("decode failure: {reason}")]
    DecodeFailure {
        /// What was wrong with the payload.
        reason: String,
    },

    /// Fetching the message behind a redirect invitation failed.
    #[error("redirect failure: {reason}")]
    RedirectFailure {
        /// Underlying transport or parse error.
        reason: String,
    },

    /// The agent could not accept a direct invitation.
    #[error("invitation failure: {reason}")]
    InvitationFailure {
        /// Underlying agent error.
        reason: String,
    },

    /// An invitation received as a deep link failed to resolve.
    #[error("deep link failure: {reason}")]
    DeepLinkFailure {
        /// Underlying resolution error.
        reason: String,
    },

    /// Closing the secure wallet store during lockout failed.
    #[error("failed to close wallet during lockout: {reason}")]
    LockoutStoreCloseFailure {
        /// Underlying agent error.
        reason: String,
    },

    /// Starting or stopping mediator message pickup failed.
    #[error("message pickup control failed: {reason}")]
    PickupControlFailure {
        /// Underlying agent error.
        reason: String,
    },

    /// A call into the agent failed.
    #[error("agent error: {reason}")]
    AgentError {
        /// Message reported by the agent.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

impl WalletgateError {
    /// Fixed numeric code, for failures that have one.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::RedirectFailure { .. } => Some(codes::REDIRECT_FAILURE),
            Self::InvitationFailure { .. } => Some(codes::INVITATION_FAILURE),
            Self::DeepLinkFailure { .. } => Some(codes::DEEP_LINK_FAILURE),
            _ => None,
        }
    }

    /// Short user-facing headline.
    pub fn title(&self) -> &'static str {
        match self {
            Self::RedirectFailure { .. } => "Unable to open invitation",
            Self::InvitationFailure { .. } => "Unable to accept invitation",
            Self::DeepLinkFailure { .. } => "Unable to open link",
            _ => "Something went wrong",
        }
    }

    /// User-facing description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RedirectFailure { .. } => {
                "The invitation this code points to could not be retrieved."
            }
            Self::InvitationFailure { .. } => {
                "The connection invitation could not be accepted."
            }
            Self::DeepLinkFailure { .. } => "The invitation in this link could not be processed.",
            _ => GENERIC_SCAN_ERROR,
        }
    }
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`WalletgateError`].
pub type Result<T> = std::result::Result<T, WalletgateError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
