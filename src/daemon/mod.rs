//! Daemon module for the Pomodoro timer.
//!
//! This module contains the core daemon functionality:
//! - `clock`: wall-clock sources
//! - `timer`: timer engine with state transitions and reconciliation
//! - `ticker`: periodic completion check
//! - `ipc`: Unix socket server and request dispatch

pub mod clock;
pub mod ipc;
pub mod ticker;
pub mod timer;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};

use crate::paths;
use crate::settings::SettingsManager;
use crate::store::FileStore;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ipc::{IpcServer, RequestHandler};
pub use ticker::{SharedEngine, Ticker, TICK_INTERVAL};
pub use timer::{Completion, EngineContext, SessionRecord, TimerEngine, TimerEvent};

/// Locations the daemon works with.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// IPC socket
    pub socket_path: PathBuf,
    /// Settings file
    pub settings_path: PathBuf,
    /// Directory for persisted timer state
    pub state_dir: PathBuf,
}

impl DaemonConfig {
    /// Resolves the default locations under the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            socket_path: paths::socket_path()?,
            settings_path: paths::settings_path()?,
            state_dir: paths::state_dir()?,
        })
    }
}

/// Logs engine events; focus completions are the session history.
async fn log_events(mut rx: mpsc::UnboundedReceiver<TimerEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            TimerEvent::FocusSessionCompleted(record) => {
                tracing::info!(
                    session_id = %record.id,
                    task = record.task_name.as_deref().unwrap_or("-"),
                    duration_seconds = record.duration_seconds,
                    focus_count = record.focus_count,
                    "Focus session completed"
                );
            }
            other => tracing::debug!("Timer event: {:?}", other),
        }
    }
}

/// Opens the engine and lines the settings revision up with it.
///
/// If the settings are behind the revision the stored state was reconciled
/// against, they are moved past it and applied, so the engine and the
/// settings agree again and later updates are not taken as stale.
///
/// # Errors
///
/// Returns an error if the settings file cannot be written.
pub fn open_engine(
    settings: &mut SettingsManager,
    ctx: EngineContext,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
) -> Result<TimerEngine> {
    let mut engine = TimerEngine::open(settings.current().clone(), ctx, event_tx);

    let applied = engine.state().settings_revision;
    if settings
        .catch_up_revision(applied)
        .context("Failed to update settings revision")?
    {
        engine.apply_settings(settings.current().clone());
    }
    Ok(engine)
}

/// Runs the daemon until Ctrl-C.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded or the socket cannot be bound.
pub async fn run(config: DaemonConfig) -> Result<()> {
    let mut settings = SettingsManager::load(&config.settings_path)
        .context("Failed to load settings")?;
    let store = FileStore::open(&config.state_dir).context("Failed to open state directory")?;
    tracing::info!("Timer state in {:?}", store.dir());

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let events = tokio::spawn(log_events(event_rx));

    let ctx = EngineContext::new(Arc::new(store), Arc::new(SystemClock));
    let engine = open_engine(&mut settings, ctx, event_tx)?;
    let engine: SharedEngine = Arc::new(Mutex::new(engine));

    let handler = Arc::new(RequestHandler::new(engine, settings));
    let snapshot = handler.resync().await;
    tracing::info!(
        "Timer ready: {} ({}s remaining, running: {})",
        snapshot.active_kind,
        snapshot.remaining_seconds,
        snapshot.is_running
    );

    let server = IpcServer::new(&config.socket_path)?;
    tracing::info!("Listening on {:?}", server.socket_path());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = ipc::serve_connection(stream, &handler).await {
                            tracing::warn!("Failed to serve request: {:#}", e);
                        }
                    });
                }
                Err(e) => tracing::warn!("{:#}", e),
            },
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    handler.shutdown().await;
    events.abort();
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{SettingsParams, TimerKind, TimerSettings};

    const T0: i64 = 1_700_000_000_000;

    fn context(store: &Arc<MemoryStore>, clock: &Arc<ManualClock>) -> EngineContext {
        EngineContext::new(store.clone(), clock.clone())
    }

    #[test]
    fn test_lost_settings_file_still_reconciles_updates() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let (tx, _rx) = mpsc::unbounded_channel();

        let previous_settings = TimerSettings::default()
            .with_focus_minutes(50)
            .with_revision(5);
        let mut previous = SettingsManager::in_memory(previous_settings);
        let engine = open_engine(&mut previous, context(&store, &clock), tx.clone()).unwrap();
        assert_eq!(engine.state().settings_revision, 5);
        drop(engine);

        // Settings restarted from defaults at revision 0
        let mut settings = SettingsManager::in_memory(TimerSettings::default());
        let mut engine = open_engine(&mut settings, context(&store, &clock), tx).unwrap();

        assert_eq!(settings.current().revision, 6);
        assert_eq!(engine.settings(), settings.current());
        assert_eq!(engine.state().slot(TimerKind::Focus).duration_seconds, 1500);

        let updated = settings
            .update(&SettingsParams {
                focus_minutes: Some(30),
                ..Default::default()
            })
            .unwrap()
            .clone();

        assert!(engine.apply_settings(updated));
        assert_eq!(engine.state().slot(TimerKind::Focus).duration_seconds, 1800);
        assert_eq!(engine.remaining_seconds(), 1800);
    }

    #[test]
    fn test_matching_revision_is_left_alone() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let (tx, _rx) = mpsc::unbounded_channel();

        let mut settings = SettingsManager::in_memory(TimerSettings::default().with_revision(3));
        open_engine(&mut settings, context(&store, &clock), tx.clone()).unwrap();
        let engine = open_engine(&mut settings, context(&store, &clock), tx).unwrap();

        assert_eq!(settings.current().revision, 3);
        assert_eq!(engine.state().settings_revision, 3);
    }
}
