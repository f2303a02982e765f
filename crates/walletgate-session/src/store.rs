//! Global session store contract.
//!
//! The core reads authentication, preferences and the pending deep link
//! through [`SessionStore`] and changes them only by dispatching a
//! [`SessionAction`]. [`InMemorySessionStore`] is the reference
//! implementation used by the runtime's simulator and by tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use walletgate_types::SessionAction;

/// Most recent dispatched actions kept by [`InMemorySessionStore`].
pub const DISPATCH_LOG_CAPACITY: usize = 256;

/// Read/dispatch access to global session state.
pub trait SessionStore: Send + Sync {
    /// Whether the user has authenticated in this session.
    fn did_authenticate(&self) -> bool;

    /// Whether the user disabled auto-lock.
    fn prevent_auto_lock(&self) -> bool;

    /// The deep link waiting to be handled, if any.
    fn deep_link(&self) -> Option<String>;

    /// Applies `action` to the store.
    fn dispatch(&self, action: SessionAction);
}

// ---------------------------------------------------------------------------
// InMemorySessionStore
// ---------------------------------------------------------------------------

/// Snapshot of an [`InMemorySessionStore`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StoreState {
    /// Authentication flag.
    pub did_authenticate: bool,
    /// Auto-lock preference.
    pub prevent_auto_lock: bool,
    /// Pending deep link.
    pub deep_link: Option<String>,
    /// Number of lockout notifications raised.
    pub lockout_notifications: u32,
}

/// Mutex-backed store that also records the most recent dispatched
/// actions, up to [`DISPATCH_LOG_CAPACITY`].
#[derive(Default)]
pub struct InMemorySessionStore {
    state: Mutex<StoreState>,
    dispatched: Mutex<VecDeque<SessionAction>>,
}

impl InMemorySessionStore {
    /// Creates a store with the given initial state.
    pub fn new(initial: StoreState) -> Self {
        Self {
            state: Mutex::new(initial),
            dispatched: Mutex::new(VecDeque::new()),
        }
    }

    /// Sets the auto-lock preference.
    pub fn set_prevent_auto_lock(&self, prevent: bool) {
        self.state().prevent_auto_lock = prevent;
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.state().clone()
    }

    /// Returns the retained dispatched actions, oldest first.
    pub fn dispatched(&self) -> Vec<SessionAction> {
        let log = self
            .dispatched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        log.iter().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        // The state is plain data; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    fn did_authenticate(&self) -> bool {
        self.state().did_authenticate
    }

    fn prevent_auto_lock(&self) -> bool {
        self.state().prevent_auto_lock
    }

    fn deep_link(&self) -> Option<String> {
        self.state().deep_link.clone()
    }

    fn dispatch(&self, action: SessionAction) {
        {
            let mut state = self.state();
            match &action {
                SessionAction::SetAuthenticated(value) => state.did_authenticate = *value,
                SessionAction::LockoutNotify => state.lockout_notifications += 1,
                SessionAction::SetActiveDeepLink(link) => state.deep_link = link.clone(),
            }
        }
        tracing::debug!(?action, "session action dispatched");
        if let Ok(mut log) = self.dispatched.lock() {
            if log.len() == DISPATCH_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(action);
        }
    }
}
