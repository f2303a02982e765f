//! Scenario file format.
//!
//! Example:
//! ```json
//! {
//!   "invitations": { "walletapp://c?oob=abc": { "ok": "conn-1" } },
//!   "redirects":   { "https://m.example/r/1": { "err": "not found" } },
//!   "steps": [
//!     { "step": "app_state", "state": "background" },
//!     { "step": "advance_ms", "ms": 301000 },
//!     { "step": "deep_link", "url": "walletapp://c?oob=abc" },
//!     { "step": "app_state", "state": "active" },
//!     { "step": "navigation_settled" },
//!     { "step": "authenticate" },
//!     { "step": "scan", "code": "https://m.example/r/1" },
//!     { "step": "status" }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use walletgate_connect::scripted::{Scripted, ScriptedAgent};
use walletgate_types::OsAppState;

/// Scripted agent answer.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    /// Resolves to this id.
    Ok(String),
    /// Fails with this reason.
    Err(String),
}

impl From<Answer> for Scripted {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Ok(id) => Ok(id),
            Answer::Err(reason) => Err(reason),
        }
    }
}

/// One simulated input.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    AppState { state: OsAppState },
    AdvanceMs { ms: u64 },
    DeepLink { url: String },
    NavigationSettled,
    Authenticate,
    Scan { code: String },
    Status,
}

/// A full scenario: agent tables plus the input sequence.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub invitations: HashMap<String, Answer>,
    pub redirects: HashMap<String, Answer>,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Loads a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read scenario file: {e}"))?;
        serde_json::from_str(&text).map_err(|e| format!("invalid scenario JSON: {e}"))
    }

    /// Builds an agent answering from this scenario's tables.
    pub fn agent(&self) -> ScriptedAgent {
        let agent = ScriptedAgent::new();
        for (raw, answer) in &self.invitations {
            agent.register_invitation(raw.clone(), answer.clone().into());
        }
        for (raw, answer) in &self.redirects {
            agent.register_redirect(raw.clone(), answer.clone().into());
        }
        agent
    }
}
