//! Session configuration with sensible defaults.
//!
//! All operational parameters of the session core are centralized here.
//! They are inputs to the core, never computed by it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, WalletgateError};

/// Global session configuration.
///
/// Every field has a default so a partial JSON file deserializes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long the app may stay in the background before the session
    /// is locked, in milliseconds.
    pub wallet_timeout_ms: u64,

    /// Whether the camera is switched back on after a failed scan so the
    /// user can try another code.
    pub enable_camera_on_error: bool,

    /// Scanned codes shorter than this are ignored without processing.
    pub min_code_length: usize,

    /// Forwarded to the agent when accepting deep-link invitations.
    pub enable_implicit_invitations: bool,

    /// Forwarded to the agent when accepting deep-link invitations.
    pub enable_reuse_connections: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wallet_timeout_ms: 300_000,
            enable_camera_on_error: true,
            min_code_length: 1,
            enable_implicit_invitations: true,
            enable_reuse_connections: true,
        }
    }
}

impl SessionConfig {
    /// Returns the wallet timeout as a [`Duration`].
    pub fn wallet_timeout(&self) -> Duration {
        Duration::from_millis(self.wallet_timeout_ms)
    }

    /// Validates all configuration values.
    ///
    /// Returns an error if any value is outside its acceptable range.
    pub fn validate(&self) -> Result<()> {
        if self.wallet_timeout_ms == 0 {
            return Err(WalletgateError::ConfigError {
                reason: "wallet_timeout_ms must be greater than 0".into(),
            });
        }

        if self.min_code_length == 0 {
            return Err(WalletgateError::ConfigError {
                reason: "min_code_length must be at least 1".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_values() {
        let config = SessionConfig::default();
        assert_eq!(config.wallet_timeout_ms, 300_000);
        assert_eq!(config.wallet_timeout(), Duration::from_secs(300));
        assert!(config.enable_camera_on_error);
        assert_eq!(config.min_code_length, 1);
        assert!(config.enable_implicit_invitations);
        assert!(config.enable_reuse_connections);
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = SessionConfig {
            wallet_timeout_ms: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_min_code_length_rejected() {
        let config = SessionConfig {
            min_code_length: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let config: SessionConfig = serde_json::from_str(r#"{ "wallet_timeout_ms": 1000 }"#)?;
        assert_eq!(config.wallet_timeout_ms, 1000);
        assert!(config.enable_camera_on_error);
        assert_eq!(config.min_code_length, 1);
        Ok(())
    }
}
