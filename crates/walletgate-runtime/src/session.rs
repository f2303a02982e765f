//! Session lifecycle and runtime state machine.
//!
//! [`WalletSession`] is the public entry point. It owns the lifecycle
//! monitor and deep-link handler until [`WalletSession::start`] moves
//! them into the event-loop task, and exposes a channel-based API after
//! that.
//!
//! # State machine
//!
//! ```text
//! Initializing ──start()──▶ Running ──shutdown()──▶ ShuttingDown ──▶ (dropped)
//! ```
//!
//! Double-start and shutdown-from-initializing are rejected with
//! `WalletgateError::ConfigError`.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use walletgate_connect::agent::{Agent, InvitationOptions};
use walletgate_connect::navigation::Navigator;
use walletgate_connect::orchestrator::ConnectionOrchestrator;
use walletgate_session::deep_link::DeepLinkHandler;
use walletgate_session::error_sink::ErrorSink;
use walletgate_session::lifecycle::LifecycleMonitor;
use walletgate_session::store::SessionStore;
use walletgate_types::config::SessionConfig;
use walletgate_types::{Result, SessionEvent, WalletgateError};

use crate::command::SessionCommand;
use crate::event_loop;

// ---------------------------------------------------------------------------
// Channel buffer sizes
// ---------------------------------------------------------------------------

/// Bounded command channel capacity.
const COMMAND_CHANNEL_SIZE: usize = 64;

/// Bounded session event channel capacity.
const EVENT_CHANNEL_SIZE: usize = 256;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle state of the runtime itself (not the wallet session phase).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// Components created, event loop not started.
    Initializing,
    /// Event loop is active.
    Running,
    /// Shutdown requested.
    ShuttingDown,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Running => write!(f, "running"),
            Self::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionRuntime (internal)
// ---------------------------------------------------------------------------

/// Owned state moved into the event-loop task.
pub(crate) struct SessionRuntime {
    pub monitor: LifecycleMonitor,
    pub links: DeepLinkHandler,
    pub store: Arc<dyn SessionStore>,
    pub event_tx: mpsc::Sender<SessionEvent>,
    pub command_rx: mpsc::Receiver<SessionCommand>,
    pub shutdown_rx: watch::Receiver<bool>,
}

// ---------------------------------------------------------------------------
// WalletSession
// ---------------------------------------------------------------------------

/// A wallet session: lifecycle lockout plus deep-link delivery.
///
/// After [`WalletSession::new`], call [`WalletSession::start`] to spawn
/// the event loop, then:
///
/// - send [`SessionCommand`]s via [`WalletSession::command_sender`];
/// - receive [`SessionEvent`]s via [`WalletSession::take_event_receiver`];
/// - stop via [`SessionCommand::Shutdown`] or [`WalletSession::shutdown`].
pub struct WalletSession {
    state: SessionState,
    runtime: Option<SessionRuntime>,
    command_tx: mpsc::Sender<SessionCommand>,
    event_rx: Option<mpsc::Receiver<SessionEvent>>,
    shutdown_tx: watch::Sender<bool>,
}

impl WalletSession {
    /// Creates a session around the given collaborators.
    ///
    /// # Errors
    ///
    /// - `WalletgateError::ConfigError` if `config` fails validation.
    pub fn new(
        config: SessionConfig,
        agent: Arc<dyn Agent>,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        errors: Arc<dyn ErrorSink>,
    ) -> Result<Self> {
        config.validate()?;

        let monitor = LifecycleMonitor::new(&config, Arc::clone(&agent), Arc::clone(&store));
        let links = DeepLinkHandler::new(
            ConnectionOrchestrator::new(agent),
            Arc::clone(&store),
            navigator,
            errors,
            InvitationOptions::for_deep_link(&config),
        );

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runtime = SessionRuntime {
            monitor,
            links,
            store,
            event_tx,
            command_rx,
            shutdown_rx,
        };

        Ok(Self {
            state: SessionState::Initializing,
            runtime: Some(runtime),
            command_tx,
            event_rx: Some(event_rx),
            shutdown_tx,
        })
    }

    /// Spawns the event loop. Transitions `Initializing → Running`.
    ///
    /// Returns a `JoinHandle` that resolves once the loop exits.
    ///
    /// # Errors
    ///
    /// - `WalletgateError::ConfigError` if the session is not in
    ///   `Initializing` state.
    pub fn start(&mut self) -> Result<JoinHandle<()>> {
        if self.state != SessionState::Initializing {
            return Err(WalletgateError::ConfigError {
                reason: format!(
                    "cannot start session in state '{}'; expected 'initializing'",
                    self.state,
                ),
            });
        }

        let runtime = self.runtime.take().ok_or_else(|| WalletgateError::ConfigError {
            reason: "runtime already consumed (double start?)".into(),
        })?;

        let handle = tokio::spawn(event_loop::run_event_loop(runtime));
        self.state = SessionState::Running;
        Ok(handle)
    }

    /// Signals the event loop to exit.
    ///
    /// Idempotent once running.
    ///
    /// # Errors
    ///
    /// - `WalletgateError::ConfigError` if the session was never started.
    pub fn shutdown(&mut self) -> Result<()> {
        match self.state {
            SessionState::Initializing => Err(WalletgateError::ConfigError {
                reason: "cannot shutdown a session that has not been started".into(),
            }),
            SessionState::ShuttingDown => Ok(()),
            SessionState::Running => {
                self.state = SessionState::ShuttingDown;
                if self.shutdown_tx.send(true).is_err() {
                    tracing::debug!("event loop already exited");
                }
                Ok(())
            }
        }
    }

    /// Returns a cloneable sender for commands.
    pub fn command_sender(&self) -> mpsc::Sender<SessionCommand> {
        self.command_tx.clone()
    }

    /// Takes the event receiver. Returns `None` once taken.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.event_rx.take()
    }

    /// Current runtime state.
    pub fn state(&self) -> SessionState {
        self.state
    }
}
