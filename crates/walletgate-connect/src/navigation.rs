//! Contract for the navigation collaborator.

use walletgate_types::NavigationTarget;

/// Receives terminal navigation requests.
///
/// The core never renders; it only asks the UI to move to a screen.
pub trait Navigator: Send + Sync {
    /// Requests navigation to `target`.
    fn navigate(&self, target: NavigationTarget);
}
