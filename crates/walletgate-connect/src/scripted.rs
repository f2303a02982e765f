//! Table-driven [`Agent`] used by the simulator and by tests.
//!
//! Invitations and redirects are answered from lookup tables filled in
//! ahead of time. Every call is recorded so callers can assert on what
//! the core asked the agent to do.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use walletgate_types::{Result, WalletgateError};

use crate::agent::{Agent, AgentMessage, ConnectionRecord, InvitationOptions};

/// Scripted answer: `Ok(id)` or `Err(reason)`.
pub type Scripted = std::result::Result<String, String>;

// ---------------------------------------------------------------------------
// AgentCall
// ---------------------------------------------------------------------------

/// One recorded call into the agent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AgentCall {
    /// `receive_invitation` was called.
    ReceiveInvitation {
        /// The raw invitation string.
        raw: String,
        /// Flags passed along.
        options: InvitationOptions,
    },
    /// `fetch_redirected_message` was called.
    FetchRedirect(String),
    /// `close_wallet` was called.
    CloseWallet,
    /// `start_message_pickup` was called.
    StartPickup,
    /// `stop_message_pickup` was called.
    StopPickup,
}

// ---------------------------------------------------------------------------
// ScriptedAgent
// ---------------------------------------------------------------------------

/// An agent whose answers come from lookup tables.
///
/// Unknown invitations and redirects fail. All mutators take `&self` so
/// the agent can be reconfigured while shared behind an `Arc`.
pub struct ScriptedAgent {
    initialized: AtomicBool,
    fail_wallet_close: AtomicBool,
    fail_pickup: AtomicBool,
    invitations: Mutex<HashMap<String, Scripted>>,
    redirects: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<AgentCall>>,
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAgent {
    /// Creates an initialized agent with empty tables.
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(true),
            fail_wallet_close: AtomicBool::new(false),
            fail_pickup: AtomicBool::new(false),
            invitations: Mutex::new(HashMap::new()),
            redirects: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Scripts the answer to `receive_invitation(raw)`.
    pub fn register_invitation(&self, raw: impl Into<String>, outcome: Scripted) {
        if let Ok(mut table) = self.invitations.lock() {
            table.insert(raw.into(), outcome);
        }
    }

    /// Scripts the answer to `fetch_redirected_message(raw)`.
    pub fn register_redirect(&self, raw: impl Into<String>, outcome: Scripted) {
        if let Ok(mut table) = self.redirects.lock() {
            table.insert(raw.into(), outcome);
        }
    }

    /// Sets the value reported by [`Agent::is_initialized`].
    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::SeqCst);
    }

    /// Makes `close_wallet` fail.
    pub fn fail_wallet_close(&self, fail: bool) {
        self.fail_wallet_close.store(fail, Ordering::SeqCst);
    }

    /// Makes pickup start/stop fail.
    pub fn fail_pickup(&self, fail: bool) {
        self.fail_pickup.store(fail, Ordering::SeqCst);
    }

    /// Returns a snapshot of every recorded call, oldest first.
    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Counts recorded calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&AgentCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: AgentCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn lookup(table: &Mutex<HashMap<String, Scripted>>, raw: &str) -> Result<String> {
        let table = table.lock().map_err(|_| WalletgateError::AgentError {
            reason: "scripted agent lock poisoned".into(),
        })?;
        match table.get(raw) {
            Some(Ok(id)) => Ok(id.clone()),
            Some(Err(reason)) => Err(WalletgateError::AgentError {
                reason: reason.clone(),
            }),
            None => Err(WalletgateError::AgentError {
                reason: format!("no scripted answer for '{raw}'"),
            }),
        }
    }

    fn pickup_result(&self) -> Result<()> {
        if self.fail_pickup.load(Ordering::SeqCst) {
            return Err(WalletgateError::AgentError {
                reason: "mediator unreachable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn receive_invitation(
        &self,
        raw: &str,
        options: &InvitationOptions,
    ) -> Result<ConnectionRecord> {
        self.record(AgentCall::ReceiveInvitation {
            raw: raw.to_string(),
            options: *options,
        });
        let id = Self::lookup(&self.invitations, raw)?;
        Ok(ConnectionRecord { id })
    }

    async fn fetch_redirected_message(&self, raw: &str) -> Result<AgentMessage> {
        self.record(AgentCall::FetchRedirect(raw.to_string()));
        let id = Self::lookup(&self.redirects, raw)?;
        Ok(AgentMessage { id })
    }

    async fn close_wallet(&self) -> Result<()> {
        self.record(AgentCall::CloseWallet);
        if self.fail_wallet_close.load(Ordering::SeqCst) {
            return Err(WalletgateError::AgentError {
                reason: "wallet already closed".into(),
            });
        }
        Ok(())
    }

    async fn start_message_pickup(&self) -> Result<()> {
        self.record(AgentCall::StartPickup);
        self.pickup_result()
    }

    async fn stop_message_pickup(&self) -> Result<()> {
        self.record(AgentCall::StopPickup);
        self.pickup_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_invitation_fails() {
        let agent = ScriptedAgent::new();
        let result = agent
            .receive_invitation("nope", &InvitationOptions::default())
            .await;
        assert!(result.is_err());
        assert_eq!(agent.calls().len(), 1);
    }

    #[tokio::test]
    async fn records_calls_in_order() -> Result<()> {
        let agent = ScriptedAgent::new();
        agent.stop_message_pickup().await?;
        agent.close_wallet().await?;
        agent.start_message_pickup().await?;
        assert_eq!(
            agent.calls(),
            vec![AgentCall::StopPickup, AgentCall::CloseWallet, AgentCall::StartPickup]
        );
        Ok(())
    }

    #[tokio::test]
    async fn failure_switches_apply() {
        let agent = ScriptedAgent::new();
        agent.fail_wallet_close(true);
        agent.fail_pickup(true);
        assert!(agent.close_wallet().await.is_err());
        assert!(agent.start_message_pickup().await.is_err());
        assert_eq!(agent.count_calls(|c| *c == AgentCall::CloseWallet), 1);
    }
}
