//! Walletgate session runtime.
//!
//! Hosts the lifecycle monitor, deep-link handler and message pickup
//! inside a single event-loop task driven by [`command::SessionCommand`]s.

pub mod command;
mod event_loop;
pub mod session;
