//! CLI argument parsing and config file support.
//!
//! The simulator is configured via CLI flags, a JSON config file, or
//! both (CLI overrides the file).

use std::path::{Path, PathBuf};

use walletgate_types::config::SessionConfig;

// ---------------------------------------------------------------------------
// CLI arguments (manual parsing, no clap dependency)
// ---------------------------------------------------------------------------

/// Parsed command-line arguments.
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub scenario_path: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub prevent_auto_lock: bool,
}

impl CliArgs {
    /// Parses CLI arguments from `std::env::args`.
    pub fn parse_from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut cli = Self {
            config_path: None,
            scenario_path: None,
            timeout_ms: None,
            prevent_auto_lock: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    i += 1;
                    cli.config_path = args.get(i).map(PathBuf::from);
                }
                "--scenario" => {
                    i += 1;
                    cli.scenario_path = args.get(i).map(PathBuf::from);
                }
                "--timeout-ms" => {
                    i += 1;
                    cli.timeout_ms = args.get(i).and_then(|s| s.parse().ok());
                }
                "--prevent-auto-lock" => {
                    cli.prevent_auto_lock = true;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                other => {
                    eprintln!("unknown argument: {other}");
                    eprintln!("use --help for usage information");
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        cli
    }
}

// ---------------------------------------------------------------------------
// Resolved config
// ---------------------------------------------------------------------------

/// Fully resolved simulator configuration.
pub struct SimConfig {
    pub session: SessionConfig,
    pub scenario_path: PathBuf,
    pub prevent_auto_lock: bool,
}

impl SimConfig {
    /// Builds the config from CLI args, reading the config file if one
    /// was given.
    ///
    /// Example `session.json` (every field optional):
    /// ```json
    /// { "wallet_timeout_ms": 60000, "enable_camera_on_error": false }
    /// ```
    pub fn resolve(cli: &CliArgs) -> Result<Self, String> {
        let session = match &cli.config_path {
            Some(path) => load_session_config(path)?,
            None => SessionConfig::default(),
        };
        let scenario_path = cli
            .scenario_path
            .clone()
            .ok_or_else(|| "missing --scenario <PATH>".to_string())?;

        let cfg = Self {
            session,
            scenario_path,
            prevent_auto_lock: false,
        };
        Ok(cfg.merge_cli(cli))
    }

    /// Merges CLI overrides onto a config-file base.
    pub fn merge_cli(mut self, cli: &CliArgs) -> Self {
        if let Some(ms) = cli.timeout_ms {
            self.session.wallet_timeout_ms = ms;
        }
        if cli.prevent_auto_lock {
            self.prevent_auto_lock = true;
        }
        self
    }
}

/// Loads a [`SessionConfig`] from a JSON file.
pub fn load_session_config(path: &Path) -> Result<SessionConfig, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read config file: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config JSON: {e}"))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_help() {
    println!(
        r#"Walletgate simulator - replays a wallet session scenario

USAGE:
    walletgate-sim --scenario <PATH> [OPTIONS]

OPTIONS:
    --scenario <PATH>        Scenario JSON file (required)
    --config <PATH>          Load session settings from JSON config file
    --timeout-ms <MS>        Background lock timeout in milliseconds
    --prevent-auto-lock      Never lock on return from background
    -h, --help               Show this help

ENVIRONMENT:
    RUST_LOG                 Log level filter (default: info)
"#
    );
}
