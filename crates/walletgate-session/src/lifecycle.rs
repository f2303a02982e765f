//! Foreground/background state machine with timeout lockout.
//!
//! # State machine
//!
//! ```text
//!             background            return, elapsed < timeout
//! Foreground ───────────▶ BackgroundTiming ─────────────────────▶ Foreground
//!      ▲                        │
//!      │ re-authenticated       │ return, elapsed >= timeout
//!      │                        ▼
//!      └─────────────────── Locked
//! ```
//!
//! - An *inactive* signal from *active* is an OS prompt. It is dropped
//!   entirely: no timer, no state update.
//! - `background_since` is set only on the explicit *active → background*
//!   edge and is consumed by the lockout check.
//! - While suspended (in background, or locked and waiting for the
//!   re-authentication screen to mount) deep links are held and message
//!   pickup is stopped.
//!
//! Every transition checks the current phase before acting, so one
//! background period can produce at most one lockout.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use walletgate_connect::agent::Agent;
use walletgate_types::config::SessionConfig;
use walletgate_types::{OsAppState, SessionAction, SessionPhase, WalletgateError};

use crate::pickup::MessagePickupController;
use crate::store::SessionStore;

// ---------------------------------------------------------------------------
// LifecycleState
// ---------------------------------------------------------------------------

/// Observable lifecycle state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LifecycleState {
    /// Current phase.
    pub phase: SessionPhase,
    /// When the app went to the background, while the timer runs.
    pub background_since: Option<Instant>,
    /// OS state before the last accepted signal.
    pub prev_os_state: Option<OsAppState>,
    /// Last accepted OS state.
    pub curr_os_state: OsAppState,
}

/// Result of feeding one signal into the monitor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Nothing changed that callers need to react to.
    None,
    /// Foreground → BackgroundTiming.
    EnteredBackground,
    /// BackgroundTiming → Foreground within the timeout.
    ResumedForeground,
    /// BackgroundTiming → Locked.
    LockedOut,
    /// The suspension flag was released.
    SuspensionReleased,
    /// Locked → Foreground after re-authentication.
    Reauthenticated,
}

// ---------------------------------------------------------------------------
// LifecycleMonitor
// ---------------------------------------------------------------------------

/// Owns the lifecycle state and the pickup controller.
pub struct LifecycleMonitor {
    state: LifecycleState,
    suspended: bool,
    release_on_navigation: bool,
    timeout: Duration,
    agent: Arc<dyn Agent>,
    store: Arc<dyn SessionStore>,
    pickup: MessagePickupController,
}

impl LifecycleMonitor {
    /// Creates a monitor for an app that starts active and in the
    /// foreground.
    pub fn new(
        config: &SessionConfig,
        agent: Arc<dyn Agent>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            state: LifecycleState {
                phase: SessionPhase::Foreground,
                background_since: None,
                prev_os_state: None,
                curr_os_state: OsAppState::Active,
            },
            suspended: false,
            release_on_navigation: false,
            timeout: config.wallet_timeout(),
            pickup: MessagePickupController::new(Arc::clone(&agent)),
            agent,
            store,
        }
    }

    /// Starts message pickup for the initial foreground state.
    pub fn start(&mut self) {
        self.pickup.set_background(self.suspended);
    }

    /// Handles an OS app-state change.
    pub async fn on_app_state_change(&mut self, next: OsAppState) -> Transition {
        let curr = self.state.curr_os_state;
        let mut transition = Transition::None;

        if curr == OsAppState::Active && next.is_away() {
            if next == OsAppState::Inactive {
                tracing::debug!("inactive signal from active ignored");
                return Transition::None;
            }
            transition = self.enter_background();
        }

        self.state.prev_os_state = Some(curr);
        self.state.curr_os_state = next;

        if next == OsAppState::Active && curr.is_away() {
            // Consume the edge so it is acted on once.
            self.state.prev_os_state = Some(next);
            transition = self.on_return_to_active().await;
        }

        transition
    }

    /// Signals that a pending navigation transition has settled.
    ///
    /// After a lockout this releases the suspension, once the
    /// re-authentication screen is mounted.
    pub fn navigation_settled(&mut self) -> Transition {
        if !self.release_on_navigation {
            return Transition::None;
        }
        self.release_on_navigation = false;
        self.release_suspension();
        Transition::SuspensionReleased
    }

    /// Signals that the user authenticated again.
    pub fn on_authenticated(&mut self) -> Transition {
        if self.state.phase != SessionPhase::Locked || !self.store.did_authenticate() {
            return Transition::None;
        }
        self.state.phase = SessionPhase::Foreground;
        tracing::info!("session unlocked");
        Transition::Reauthenticated
    }

    /// Whether a pending deep link may be delivered now.
    pub fn deep_link_gate_open(&self) -> bool {
        self.state.phase == SessionPhase::Foreground
            && !self.suspended
            && self.store.did_authenticate()
            && self.agent.is_initialized()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    /// Copy of the full state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether deep links and message pickup are suspended.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Waits for outstanding pickup requests.
    pub async fn drain_pickup(&mut self) {
        self.pickup.drain().await;
    }

    // -- Transitions -----------------------------------------------------

    fn enter_background(&mut self) -> Transition {
        self.suspended = true;
        self.pickup.set_background(true);

        if self.state.phase != SessionPhase::Foreground {
            // Already locked: nothing to time.
            return Transition::None;
        }

        self.state.phase = SessionPhase::BackgroundTiming;
        self.state.background_since = Some(Instant::now());
        tracing::info!("app backgrounded, lock timer started");
        Transition::EnteredBackground
    }

    async fn on_return_to_active(&mut self) -> Transition {
        match self.state.phase {
            SessionPhase::BackgroundTiming => self.lockout_check().await,
            SessionPhase::Locked if self.suspended && !self.release_on_navigation => {
                self.release_suspension();
                Transition::SuspensionReleased
            }
            _ => Transition::None,
        }
    }

    async fn lockout_check(&mut self) -> Transition {
        // A missing timestamp means no lock.
        let elapsed = self.state.background_since.take().map(|since| since.elapsed());
        let expired = !self.store.prevent_auto_lock()
            && elapsed.is_some_and(|e| e >= self.timeout);

        if expired {
            self.lockout(elapsed.unwrap_or_default()).await;
            return Transition::LockedOut;
        }

        self.state.phase = SessionPhase::Foreground;
        self.release_suspension();
        tracing::info!(?elapsed, "returned to foreground");
        Transition::ResumedForeground
    }

    async fn lockout(&mut self, elapsed: Duration) {
        self.state.phase = SessionPhase::Locked;
        self.release_on_navigation = true;
        tracing::info!(?elapsed, "wallet timeout exceeded, locking");

        if !self.store.did_authenticate() {
            return;
        }

        match self.agent.close_wallet().await {
            Ok(()) => tracing::info!("closed agent wallet"),
            Err(e) => {
                let err = WalletgateError::LockoutStoreCloseFailure {
                    reason: e.to_string(),
                };
                tracing::error!(%err, "continuing lockout");
            }
        }

        self.store.dispatch(SessionAction::SetAuthenticated(false));
        self.store.dispatch(SessionAction::LockoutNotify);
    }

    fn release_suspension(&mut self) {
        self.suspended = false;
        self.pickup.set_background(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemorySessionStore, StoreState};
    use walletgate_connect::scripted::{AgentCall, ScriptedAgent};

    fn monitor(timeout_ms: u64) -> (LifecycleMonitor, Arc<ScriptedAgent>, Arc<InMemorySessionStore>) {
        let config = SessionConfig {
            wallet_timeout_ms: timeout_ms,
            ..SessionConfig::default()
        };
        let agent = Arc::new(ScriptedAgent::new());
        let store = Arc::new(InMemorySessionStore::new(StoreState {
            did_authenticate: true,
            ..StoreState::default()
        }));
        let m = LifecycleMonitor::new(&config, agent.clone(), store.clone());
        (m, agent, store)
    }

    #[tokio::test(start_paused = true)]
    async fn background_sets_timestamp() {
        let (mut m, _, _) = monitor(1000);
        let t = m.on_app_state_change(OsAppState::Background).await;
        assert_eq!(t, Transition::EnteredBackground);
        assert_eq!(m.phase(), SessionPhase::BackgroundTiming);
        assert!(m.state().background_since.is_some());
        assert!(m.is_suspended());
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_alone_is_dropped() {
        let (mut m, _, _) = monitor(1000);
        assert_eq!(m.on_app_state_change(OsAppState::Inactive).await, Transition::None);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(m.on_app_state_change(OsAppState::Active).await, Transition::None);

        let state = m.state();
        assert_eq!(state.phase, SessionPhase::Foreground);
        assert_eq!(state.background_since, None);
        assert_eq!(state.curr_os_state, OsAppState::Active);
        assert!(!m.is_suspended());
    }

    #[tokio::test(start_paused = true)]
    async fn short_background_resumes() {
        let (mut m, agent, store) = monitor(1000);
        m.on_app_state_change(OsAppState::Background).await;
        tokio::time::advance(Duration::from_millis(999)).await;

        let t = m.on_app_state_change(OsAppState::Active).await;
        assert_eq!(t, Transition::ResumedForeground);
        assert_eq!(m.phase(), SessionPhase::Foreground);
        assert_eq!(m.state().background_since, None);
        assert!(store.did_authenticate());
        assert_eq!(agent.count_calls(|c| *c == AgentCall::CloseWallet), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_locks_and_closes_wallet_once() {
        let (mut m, agent, store) = monitor(300_000);
        m.on_app_state_change(OsAppState::Background).await;
        tokio::time::advance(Duration::from_millis(301_000)).await;

        let t = m.on_app_state_change(OsAppState::Active).await;
        assert_eq!(t, Transition::LockedOut);
        assert_eq!(m.phase(), SessionPhase::Locked);
        assert!(!store.did_authenticate());
        assert_eq!(store.snapshot().lockout_notifications, 1);
        assert_eq!(agent.count_calls(|c| *c == AgentCall::CloseWallet), 1);

        // Suspension holds until the auth screen is mounted.
        assert!(m.is_suspended());
        assert_eq!(m.navigation_settled(), Transition::SuspensionReleased);
        assert!(!m.is_suspended());
        assert_eq!(m.navigation_settled(), Transition::None);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_equal_to_timeout_locks() {
        let (mut m, _, _) = monitor(1000);
        m.on_app_state_change(OsAppState::Background).await;
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(
            m.on_app_state_change(OsAppState::Active).await,
            Transition::LockedOut
        );
    }

    #[tokio::test(start_paused = true)]
    async fn prevent_auto_lock_keeps_session() {
        let (mut m, agent, store) = monitor(1000);
        store.set_prevent_auto_lock(true);
        m.on_app_state_change(OsAppState::Background).await;
        tokio::time::advance(Duration::from_secs(3600)).await;

        let t = m.on_app_state_change(OsAppState::Active).await;
        assert_eq!(t, Transition::ResumedForeground);
        assert!(store.did_authenticate());
        assert!(agent.calls().iter().all(|c| *c != AgentCall::CloseWallet));
    }

    #[tokio::test(start_paused = true)]
    async fn wallet_close_failure_does_not_stop_lockout() {
        let (mut m, agent, store) = monitor(1000);
        agent.fail_wallet_close(true);
        m.on_app_state_change(OsAppState::Background).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(
            m.on_app_state_change(OsAppState::Active).await,
            Transition::LockedOut
        );
        assert!(!store.did_authenticate());
    }

    #[tokio::test(start_paused = true)]
    async fn ios_prompt_sequence_through_inactive() {
        let (mut m, _, _) = monitor(1000);
        m.on_app_state_change(OsAppState::Inactive).await;
        m.on_app_state_change(OsAppState::Background).await;
        assert_eq!(m.phase(), SessionPhase::BackgroundTiming);

        m.on_app_state_change(OsAppState::Inactive).await;
        assert_eq!(m.phase(), SessionPhase::BackgroundTiming);
        assert_eq!(
            m.on_app_state_change(OsAppState::Active).await,
            Transition::ResumedForeground
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reauthentication_unlocks() {
        let (mut m, _, store) = monitor(1000);
        m.on_app_state_change(OsAppState::Background).await;
        tokio::time::advance(Duration::from_secs(2)).await;
        m.on_app_state_change(OsAppState::Active).await;
        m.navigation_settled();

        assert_eq!(m.on_authenticated(), Transition::None);
        store.dispatch(SessionAction::SetAuthenticated(true));
        assert_eq!(m.on_authenticated(), Transition::Reauthenticated);
        assert_eq!(m.phase(), SessionPhase::Foreground);
        assert!(m.deep_link_gate_open());
    }

    #[tokio::test(start_paused = true)]
    async fn backgrounding_while_locked_does_not_retime() {
        let (mut m, agent, _) = monitor(1000);
        m.on_app_state_change(OsAppState::Background).await;
        tokio::time::advance(Duration::from_secs(2)).await;
        m.on_app_state_change(OsAppState::Active).await;
        m.navigation_settled();

        assert_eq!(m.on_app_state_change(OsAppState::Background).await, Transition::None);
        assert_eq!(m.state().background_since, None);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(
            m.on_app_state_change(OsAppState::Active).await,
            Transition::SuspensionReleased
        );
        assert_eq!(m.phase(), SessionPhase::Locked);
        assert_eq!(agent.count_calls(|c| *c == AgentCall::CloseWallet), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_requires_initialized_agent() {
        let (m, agent, _) = monitor(1000);
        assert!(m.deep_link_gate_open());
        agent.set_initialized(false);
        assert!(!m.deep_link_gate_open());
    }

    #[tokio::test(start_paused = true)]
    async fn pickup_follows_suspension() {
        let (mut m, agent, _) = monitor(1000);
        m.start();
        m.on_app_state_change(OsAppState::Background).await;
        m.drain_pickup().await;
        m.on_app_state_change(OsAppState::Active).await;
        m.drain_pickup().await;

        assert_eq!(
            agent.calls(),
            vec![AgentCall::StartPickup, AgentCall::StopPickup, AgentCall::StartPickup]
        );
    }
}
