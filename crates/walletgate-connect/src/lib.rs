//! Connection establishment from scanned codes and links.
//!
//! The scan screen feeds raw camera values into a [`scan_session::ScanSession`],
//! which asks the [`scan_gate::ScanGate`] whether to process them and hands
//! accepted values to the [`orchestrator::ConnectionOrchestrator`]. The
//! orchestrator classifies and resolves them through the
//! [`agent::Agent`] contract.

pub mod agent;
pub mod navigation;
pub mod orchestrator;
pub mod resolver;
pub mod scan_gate;
pub mod scan_session;
pub mod scripted;
