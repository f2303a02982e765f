//! Wallet session lifecycle.
//!
//! Tracks foreground/background transitions, locks the session out after
//! the wallet timeout, gates deep-link delivery on the session being
//! unlocked and visible, and keeps mediator message pickup in step with
//! the background flag.

pub mod deep_link;
pub mod error_sink;
pub mod lifecycle;
pub mod pickup;
pub mod store;
