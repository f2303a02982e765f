//! Event loop driving a wallet session.
//!
//! [`run_event_loop`] is spawned by `WalletSession::start`. It
//! multiplexes with `tokio::select!`:
//!
//! 1. **Commands** from the UI layer.
//! 2. **Shutdown signal** via the `watch` channel.
//!
//! After every command the pending deep link is re-examined, so a link
//! held while the session was locked goes out as soon as the gate opens.

use tokio::sync::mpsc::error::TrySendError;
use walletgate_session::deep_link::DeepLinkOutcome;
use walletgate_session::lifecycle::Transition;
use walletgate_types::{SessionAction, SessionEvent, SessionPhase};

use crate::command::{SessionCommand, SessionStatus};
use crate::session::{SessionRuntime, SessionState};

// ---------------------------------------------------------------------------
// Event loop entry point
// ---------------------------------------------------------------------------

/// Runs the session until shutdown is signalled or every command
/// sender is gone.
pub(crate) async fn run_event_loop(mut rt: SessionRuntime) {
    tracing::info!("session event loop started");

    rt.monitor.start();
    deliver_deep_link(&mut rt).await;

    loop {
        tokio::select! {
            // ---------------------------------------------------------------
            // 1. Commands from the UI layer.
            // ---------------------------------------------------------------
            cmd = rt.command_rx.recv() => {
                let Some(cmd) = cmd else {
                    tracing::info!("command channel closed -- exiting event loop");
                    break;
                };
                tracing::debug!(?cmd, "session command");
                if handle_command(cmd, &mut rt).await {
                    tracing::info!("shutdown command received -- exiting event loop");
                    break;
                }
                deliver_deep_link(&mut rt).await;
            }

            // ---------------------------------------------------------------
            // 2. Shutdown signal via watch channel.
            // ---------------------------------------------------------------
            changed = rt.shutdown_rx.changed() => {
                if changed.is_err() || *rt.shutdown_rx.borrow() {
                    tracing::info!("shutdown signal received -- exiting event loop");
                    break;
                }
            }
        }
    }

    shutdown_sequence(&mut rt).await;
    tracing::info!("session event loop exited");
}

// ---------------------------------------------------------------------------
// Command handler
// ---------------------------------------------------------------------------

/// Processes a single command.
///
/// Returns `true` if the event loop should exit. A lockout (including
/// the awaited wallet close) completes before the next command is read.
async fn handle_command(cmd: SessionCommand, rt: &mut SessionRuntime) -> bool {
    match cmd {
        SessionCommand::AppStateChanged(next) => {
            let from = rt.monitor.phase();
            let transition = rt.monitor.on_app_state_change(next).await;
            report_transition(rt, from, transition);
            false
        }

        SessionCommand::NavigationSettled => {
            let from = rt.monitor.phase();
            let transition = rt.monitor.navigation_settled();
            report_transition(rt, from, transition);
            false
        }

        SessionCommand::Authenticated => {
            let from = rt.monitor.phase();
            rt.store.dispatch(SessionAction::SetAuthenticated(true));
            let transition = rt.monitor.on_authenticated();
            report_transition(rt, from, transition);
            false
        }

        SessionCommand::DeepLinkOpened(link) => {
            rt.store.dispatch(SessionAction::SetActiveDeepLink(Some(link)));
            false
        }

        SessionCommand::GetStatus { reply } => {
            if reply.send(build_status(rt)).is_err() {
                tracing::debug!("status requester went away");
            }
            false
        }

        SessionCommand::Shutdown => true,
    }
}

fn build_status(rt: &SessionRuntime) -> SessionStatus {
    let lifecycle = rt.monitor.state();
    SessionStatus {
        state: SessionState::Running,
        phase: lifecycle.phase,
        os_state: lifecycle.curr_os_state,
        suspended: rt.monitor.is_suspended(),
        authenticated: rt.store.did_authenticate(),
        pending_deep_link: rt.store.deep_link(),
    }
}

// ---------------------------------------------------------------------------
// Event emission
// ---------------------------------------------------------------------------

fn report_transition(rt: &SessionRuntime, from: SessionPhase, transition: Transition) {
    let to = rt.monitor.phase();
    if from != to {
        emit(rt, SessionEvent::PhaseChanged { from, to });
    }
    if transition == Transition::LockedOut {
        emit(rt, SessionEvent::LockedOut);
    }
}

async fn deliver_deep_link(rt: &mut SessionRuntime) {
    let gate_open = rt.monitor.deep_link_gate_open();
    let event = match rt.links.process(gate_open).await {
        DeepLinkOutcome::Idle | DeepLinkOutcome::Held => return,
        DeepLinkOutcome::Inert => SessionEvent::DeepLinkCleared,
        DeepLinkOutcome::Delivered(target) => SessionEvent::DeepLinkDelivered { target },
        DeepLinkOutcome::Failed(report) => SessionEvent::DeepLinkFailed { code: report.code },
    };
    emit(rt, event);
}

/// Sends `event` without blocking the loop on a slow consumer.
fn emit(rt: &SessionRuntime, event: SessionEvent) {
    match rt.event_tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            tracing::warn!(?event, "session event channel full, event dropped");
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!("no session event consumer");
        }
    }
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

async fn shutdown_sequence(rt: &mut SessionRuntime) {
    tracing::info!("running shutdown sequence");

    rt.monitor.drain_pickup().await;

    tracing::info!(
        phase = %rt.monitor.phase(),
        pending_deep_link = rt.store.deep_link().is_some(),
        "shutdown complete"
    );
}
