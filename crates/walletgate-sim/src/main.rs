//! Walletgate simulator -- replays a wallet session scenario.
//!
//! Usage:
//!
//!   walletgate-sim --scenario <PATH> [OPTIONS]
//!
//! Options:
//!
//!   --scenario <PATH>       Scenario JSON file
//!   --config <PATH>         Load session settings from JSON file
//!   --timeout-ms <MS>       Background lock timeout
//!   --prevent-auto-lock     Never lock on return from background
//!
//! The agent answers invitations and redirects from the tables in the
//! scenario file. Navigation requests, session events and reported
//! errors are logged.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use walletgate_connect::navigation::Navigator;
use walletgate_connect::orchestrator::ConnectionOrchestrator;
use walletgate_connect::scan_gate::CaptureDevice;
use walletgate_connect::scan_session::{ScanOutcome, ScanSession};
use walletgate_runtime::command::{SessionCommand, SessionStatus};
use walletgate_runtime::session::WalletSession;
use walletgate_session::store::{InMemorySessionStore, StoreState};
use walletgate_types::{ErrorReport, NavigationTarget};

mod config;
mod scenario;

use scenario::{Scenario, Step};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = config::CliArgs::parse_from_env();
    let sim_config = match config::SimConfig::resolve(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_sim(sim_config).await {
        tracing::error!("simulation error: {e}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, target: NavigationTarget) {
        tracing::info!(%target, "navigate");
    }
}

struct LoggingCamera;

impl CaptureDevice for LoggingCamera {
    fn set_active(&mut self, active: bool) {
        tracing::debug!(active, "camera");
    }

    fn vibrate(&mut self) {
        tracing::debug!("vibrate");
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

async fn run_sim(cfg: config::SimConfig) -> Result<(), String> {
    let scenario = Scenario::load(&cfg.scenario_path)?;
    tracing::info!(
        steps = scenario.steps.len(),
        timeout_ms = cfg.session.wallet_timeout_ms,
        prevent_auto_lock = cfg.prevent_auto_lock,
        "scenario loaded"
    );

    let agent = Arc::new(scenario.agent());
    let store = Arc::new(InMemorySessionStore::new(StoreState {
        did_authenticate: true,
        prevent_auto_lock: cfg.prevent_auto_lock,
        ..StoreState::default()
    }));
    let navigator: Arc<dyn Navigator> = Arc::new(LoggingNavigator);

    let (errors_tx, mut errors_rx) = mpsc::unbounded_channel::<ErrorReport>();
    let error_task = tokio::spawn(async move {
        while let Some(report) = errors_rx.recv().await {
            tracing::warn!(
                code = report.code,
                title = %report.title,
                detail = %report.detail,
                "error reported"
            );
        }
    });

    let mut session = WalletSession::new(
        cfg.session.clone(),
        agent.clone(),
        store.clone(),
        Arc::clone(&navigator),
        Arc::new(errors_tx),
    )
    .map_err(|e| format!("failed to create session: {e}"))?;

    let mut events = session
        .take_event_receiver()
        .ok_or_else(|| "event receiver already taken".to_string())?;
    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::info!(?event, "session event");
        }
    });

    let handle = session
        .start()
        .map_err(|e| format!("failed to start session: {e}"))?;
    let tx = session.command_sender();

    let mut scanner = ScanSession::new(
        LoggingCamera,
        &cfg.session,
        ConnectionOrchestrator::new(agent),
        navigator,
    );

    for (index, step) in scenario.steps.into_iter().enumerate() {
        tracing::debug!(index, ?step, "step");
        match step {
            Step::AppState { state } => send(&tx, SessionCommand::AppStateChanged(state)).await?,
            Step::AdvanceMs { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
            Step::DeepLink { url } => send(&tx, SessionCommand::DeepLinkOpened(url)).await?,
            Step::NavigationSettled => send(&tx, SessionCommand::NavigationSettled).await?,
            Step::Authenticate => send(&tx, SessionCommand::Authenticated).await?,
            Step::Scan { code } => match scanner.on_code_scanned(&code).await {
                ScanOutcome::Failed(err) => {
                    tracing::warn!(code = ?err.code, message = %err.message, "scan failed");
                }
                outcome => tracing::info!(?outcome, "scan"),
            },
            Step::Status => {
                let snapshot = status(&tx).await?;
                tracing::info!(status = ?snapshot, "status");
            }
        }
    }

    let final_status = status(&tx).await?;
    tracing::info!(
        phase = %final_status.phase,
        authenticated = final_status.authenticated,
        pending_deep_link = ?final_status.pending_deep_link,
        lockouts = store.snapshot().lockout_notifications,
        "scenario finished"
    );

    session
        .shutdown()
        .map_err(|e| format!("failed to stop session: {e}"))?;
    handle
        .await
        .map_err(|e| format!("event loop panicked: {e}"))?;

    // The loop held the only error and event senders.
    if let Err(e) = error_task.await {
        tracing::warn!(%e, "error logger aborted");
    }
    if let Err(e) = event_task.await {
        tracing::warn!(%e, "event logger aborted");
    }

    Ok(())
}

async fn send(tx: &mpsc::Sender<SessionCommand>, cmd: SessionCommand) -> Result<(), String> {
    tx.send(cmd)
        .await
        .map_err(|_| "session event loop is not running".to_string())
}

async fn status(tx: &mpsc::Sender<SessionCommand>) -> Result<SessionStatus, String> {
    let (reply, rx) = oneshot::channel();
    send(tx, SessionCommand::GetStatus { reply }).await?;
    rx.await
        .map_err(|_| "session event loop dropped the status request".to_string())
}
