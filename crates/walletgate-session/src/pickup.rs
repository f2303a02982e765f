//! Mediator message pickup control.
//!
//! Pickup is stopped while the app is in the background and restarted
//! when it comes back. Requests run on spawned tasks so a slow or
//! failing mediator never holds up a lifecycle transition; failures are
//! logged and otherwise ignored.
//!
//! Each request task first awaits the one before it, so the agent sees
//! start and stop calls in the order they were requested on any runtime
//! flavor.

use std::sync::Arc;

use tokio::task::JoinHandle;
use walletgate_connect::agent::Agent;
use walletgate_types::WalletgateError;

/// Last pickup state requested from the agent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PickupState {
    /// Pickup was asked to run.
    Running,
    /// Pickup was asked to stop.
    Stopped,
}

/// Starts and stops message pickup in step with the background flag.
pub struct MessagePickupController {
    agent: Arc<dyn Agent>,
    requested: Option<PickupState>,
    /// Most recent request; the next one is chained behind it.
    last: Option<JoinHandle<()>>,
}

impl MessagePickupController {
    /// Creates a controller that has not requested anything yet.
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            agent,
            requested: None,
            last: None,
        }
    }

    /// Mirrors the background flag.
    ///
    /// Returns `false` if the requested state was already in effect and
    /// nothing was sent.
    pub fn set_background(&mut self, in_background: bool) -> bool {
        let want = if in_background {
            PickupState::Stopped
        } else {
            PickupState::Running
        };
        if self.requested == Some(want) {
            return false;
        }
        self.requested = Some(want);

        let previous = self.last.take();
        let agent = Arc::clone(&self.agent);
        self.last = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::warn!(%e, "previous message pickup task aborted");
                }
            }
            let result = match want {
                PickupState::Stopped => agent.stop_message_pickup().await,
                PickupState::Running => agent.start_message_pickup().await,
            };
            match result {
                Ok(()) => tracing::info!(state = ?want, "message pickup updated"),
                Err(e) => {
                    let err = WalletgateError::PickupControlFailure {
                        reason: e.to_string(),
                    };
                    tracing::error!(%err, state = ?want, "message pickup request failed");
                }
            }
        }));
        true
    }

    /// Last requested state.
    pub fn requested(&self) -> Option<PickupState> {
        self.requested
    }

    /// Waits for every outstanding request to finish.
    ///
    /// The last request completes only after every earlier one.
    pub async fn drain(&mut self) {
        if let Some(handle) = self.last.take() {
            if let Err(e) = handle.await {
                tracing::warn!(%e, "message pickup task aborted");
            }
        }
    }
}
