//! End-to-end tests for the session runtime.
//!
//! Commands go in through the channel API; `GetStatus` is used as a
//! barrier so every earlier command has been handled before asserting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use walletgate_connect::navigation::Navigator;
use walletgate_connect::scripted::{AgentCall, ScriptedAgent};
use walletgate_runtime::command::{SessionCommand, SessionStatus};
use walletgate_runtime::session::{SessionState, WalletSession};
use walletgate_session::store::{InMemorySessionStore, StoreState};
use walletgate_types::config::SessionConfig;
use walletgate_types::{
    ConnectionId, ErrorReport, NavigationKey, NavigationTarget, OsAppState, Screen,
    SessionEvent, SessionPhase,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingNavigator {
    targets: Mutex<Vec<NavigationTarget>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: NavigationTarget) {
        if let Ok(mut t) = self.targets.lock() {
            t.push(target);
        }
    }
}

struct Fixture {
    session: WalletSession,
    agent: Arc<ScriptedAgent>,
    store: Arc<InMemorySessionStore>,
    navigator: Arc<RecordingNavigator>,
    errors_rx: mpsc::UnboundedReceiver<ErrorReport>,
}

fn fixture(timeout_ms: u64) -> Fixture {
    let config = SessionConfig {
        wallet_timeout_ms: timeout_ms,
        ..SessionConfig::default()
    };
    let agent = Arc::new(ScriptedAgent::new());
    let store = Arc::new(InMemorySessionStore::new(StoreState {
        did_authenticate: true,
        ..StoreState::default()
    }));
    let navigator = Arc::new(RecordingNavigator::default());
    let (errors_tx, errors_rx) = mpsc::unbounded_channel();

    let session = WalletSession::new(
        config,
        agent.clone(),
        store.clone(),
        navigator.clone(),
        Arc::new(errors_tx),
    )
    .expect("valid config");

    Fixture {
        session,
        agent,
        store,
        navigator,
        errors_rx,
    }
}

async fn status(tx: &mpsc::Sender<SessionCommand>) -> SessionStatus {
    let (reply, rx) = oneshot::channel();
    tx.send(SessionCommand::GetStatus { reply })
        .await
        .expect("loop running");
    rx.await.expect("status reply")
}

fn drain_events(rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

// ===========================================================================
// Runtime state machine
// ===========================================================================

#[tokio::test]
async fn invalid_config_rejected() {
    let config = SessionConfig {
        wallet_timeout_ms: 0,
        ..SessionConfig::default()
    };
    let (errors_tx, _errors_rx) = mpsc::unbounded_channel::<ErrorReport>();
    let result = WalletSession::new(
        config,
        Arc::new(ScriptedAgent::new()),
        Arc::new(InMemorySessionStore::default()),
        Arc::new(RecordingNavigator::default()),
        Arc::new(errors_tx),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn shutdown_before_start_rejected() {
    let mut f = fixture(1000);
    assert!(f.session.shutdown().is_err());
    assert_eq!(f.session.state(), SessionState::Initializing);
}

#[tokio::test]
async fn double_start_rejected_and_shutdown_idempotent() {
    let mut f = fixture(1000);
    let handle = f.session.start().expect("first start");
    assert_eq!(f.session.state(), SessionState::Running);
    assert!(f.session.start().is_err());

    f.session.shutdown().expect("shutdown");
    f.session.shutdown().expect("second shutdown is a no-op");
    assert_eq!(f.session.state(), SessionState::ShuttingDown);
    handle.await.expect("loop exits cleanly");
}

#[tokio::test]
async fn shutdown_command_stops_loop_and_pickup_started() {
    let mut f = fixture(1000);
    let handle = f.session.start().expect("start");
    let tx = f.session.command_sender();

    let s = status(&tx).await;
    assert_eq!(s.state, SessionState::Running);
    assert_eq!(s.phase, SessionPhase::Foreground);

    tx.send(SessionCommand::Shutdown).await.expect("send");
    handle.await.expect("loop exits cleanly");
    assert_eq!(f.agent.count_calls(|c| *c == AgentCall::StartPickup), 1);
}

// ===========================================================================
// Lockout
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn long_background_locks_and_reports_events() {
    let mut f = fixture(300_000);
    let mut events = f.session.take_event_receiver().expect("receiver");
    assert!(f.session.take_event_receiver().is_none());
    let handle = f.session.start().expect("start");
    let tx = f.session.command_sender();

    tx.send(SessionCommand::AppStateChanged(OsAppState::Background))
        .await
        .expect("send");
    assert_eq!(status(&tx).await.phase, SessionPhase::BackgroundTiming);

    tokio::time::advance(Duration::from_millis(301_000)).await;
    tx.send(SessionCommand::AppStateChanged(OsAppState::Active))
        .await
        .expect("send");

    let s = status(&tx).await;
    assert_eq!(s.phase, SessionPhase::Locked);
    assert!(!s.authenticated);
    assert!(s.suspended);
    assert_eq!(f.store.snapshot().lockout_notifications, 1);
    assert_eq!(f.agent.count_calls(|c| *c == AgentCall::CloseWallet), 1);

    assert_eq!(
        drain_events(&mut events),
        vec![
            SessionEvent::PhaseChanged {
                from: SessionPhase::Foreground,
                to: SessionPhase::BackgroundTiming,
            },
            SessionEvent::PhaseChanged {
                from: SessionPhase::BackgroundTiming,
                to: SessionPhase::Locked,
            },
            SessionEvent::LockedOut,
        ]
    );

    tx.send(SessionCommand::NavigationSettled).await.expect("send");
    tx.send(SessionCommand::Authenticated).await.expect("send");
    let s = status(&tx).await;
    assert_eq!(s.phase, SessionPhase::Foreground);
    assert!(s.authenticated);
    assert!(!s.suspended);

    f.session.shutdown().expect("shutdown");
    handle.await.expect("loop exits cleanly");
}

#[tokio::test(start_paused = true)]
async fn inactive_only_keeps_session() {
    let mut f = fixture(1000);
    let handle = f.session.start().expect("start");
    let tx = f.session.command_sender();

    tx.send(SessionCommand::AppStateChanged(OsAppState::Inactive))
        .await
        .expect("send");
    tokio::time::advance(Duration::from_secs(60)).await;
    tx.send(SessionCommand::AppStateChanged(OsAppState::Active))
        .await
        .expect("send");

    let s = status(&tx).await;
    assert_eq!(s.phase, SessionPhase::Foreground);
    assert!(s.authenticated);

    f.session.shutdown().expect("shutdown");
    handle.await.expect("loop exits cleanly");
}

// ===========================================================================
// Deep links
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn held_link_delivered_once_after_reauthentication() {
    let mut f = fixture(1000);
    let link = "walletapp://connect?oob=eyJ0eXBlIjoiaW52aXRlIn0";
    f.agent.register_invitation(link, Ok("conn-42".into()));
    let mut events = f.session.take_event_receiver().expect("receiver");
    let handle = f.session.start().expect("start");
    let tx = f.session.command_sender();

    tx.send(SessionCommand::AppStateChanged(OsAppState::Background))
        .await
        .expect("send");
    tx.send(SessionCommand::DeepLinkOpened(link.into()))
        .await
        .expect("send");
    tokio::time::advance(Duration::from_secs(5)).await;
    tx.send(SessionCommand::AppStateChanged(OsAppState::Active))
        .await
        .expect("send");
    tx.send(SessionCommand::NavigationSettled).await.expect("send");

    let s = status(&tx).await;
    assert_eq!(s.phase, SessionPhase::Locked);
    assert_eq!(s.pending_deep_link.as_deref(), Some(link));

    tx.send(SessionCommand::Authenticated).await.expect("send");
    tx.send(SessionCommand::NavigationSettled).await.expect("send");
    let s = status(&tx).await;
    assert_eq!(s.pending_deep_link, None);

    let expected = NavigationTarget {
        screen: Screen::Connection,
        key: NavigationKey::ConnectionId(ConnectionId::new("conn-42")),
    };
    let delivered: Vec<_> = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::DeepLinkDelivered { .. }))
        .collect();
    assert_eq!(
        delivered,
        vec![SessionEvent::DeepLinkDelivered {
            target: expected.clone()
        }]
    );
    assert_eq!(
        f.navigator.targets.lock().map(|t| t.clone()).unwrap_or_default(),
        vec![expected]
    );
    assert_eq!(
        f.agent
            .count_calls(|c| matches!(c, AgentCall::ReceiveInvitation { .. })),
        1
    );

    f.session.shutdown().expect("shutdown");
    handle.await.expect("loop exits cleanly");
}

#[tokio::test]
async fn inert_and_failing_links_are_cleared() {
    let mut f = fixture(1000);
    let mut events = f.session.take_event_receiver().expect("receiver");
    let handle = f.session.start().expect("start");
    let tx = f.session.command_sender();

    tx.send(SessionCommand::DeepLinkOpened("walletapp://settings".into()))
        .await
        .expect("send");
    tx.send(SessionCommand::DeepLinkOpened(
        "walletapp://connect?url=https%3A%2F%2Fmediator.example%2Fr".into(),
    ))
    .await
    .expect("send");

    let s = status(&tx).await;
    assert_eq!(s.pending_deep_link, None);
    assert_eq!(
        drain_events(&mut events),
        vec![
            SessionEvent::DeepLinkCleared,
            SessionEvent::DeepLinkFailed { code: 1039 },
        ]
    );

    let report = f.errors_rx.recv().await.expect("error reported");
    assert_eq!(report.code, 1039);

    f.session.shutdown().expect("shutdown");
    handle.await.expect("loop exits cleanly");
}
