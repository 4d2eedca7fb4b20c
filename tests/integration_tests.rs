//! Integration tests for Daemon-CLI IPC communication.
//!
//! These tests drive the real `IpcClient` against an `IpcServer` and
//! `RequestHandler` pair:
//! - Timer start / pause / reset via IPC
//! - Switching timers and querying status
//! - Settings updates and slot reconciliation
//! - Connection and malformed request handling

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout, Duration};

use pomodoro_engine::cli::client::IpcClient;
use pomodoro_engine::daemon::ipc::{self, IpcServer, RequestHandler};
use pomodoro_engine::daemon::{EngineContext, ManualClock, SharedEngine, TimerEngine, TimerEvent};
use pomodoro_engine::settings::SettingsManager;
use pomodoro_engine::store::MemoryStore;
use pomodoro_engine::types::{IpcResponse, SettingsParams, TimerKind, TimerSettings};

const T0: i64 = 1_700_000_000_000;

// ============================================================================
// Test Helpers
// ============================================================================

/// Creates a temporary socket path for testing.
fn create_temp_socket_path() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("integration_test.sock");
    // Keep the directory so it's not deleted
    std::mem::forget(dir);
    path
}

struct Fixture {
    engine: SharedEngine,
    clock: Arc<ManualClock>,
    client: IpcClient,
    _events: mpsc::UnboundedReceiver<TimerEvent>,
    _server: tokio::task::JoinHandle<()>,
}

/// Starts a server on a temp socket that serves connections until dropped.
async fn start_fixture(settings: TimerSettings) -> Fixture {
    let socket_path = create_temp_socket_path();
    let clock = Arc::new(ManualClock::new(T0));
    let (tx, rx) = mpsc::unbounded_channel();
    let ctx = EngineContext::new(Arc::new(MemoryStore::new()), clock.clone());
    let engine = TimerEngine::open(settings.clone(), ctx, tx);
    let engine: SharedEngine = Arc::new(Mutex::new(engine));

    let handler = Arc::new(RequestHandler::new(
        engine.clone(),
        SettingsManager::in_memory(settings),
    ));
    let server = IpcServer::new(&socket_path).unwrap();

    let server_handle = tokio::spawn(async move {
        loop {
            let Ok(stream) = server.accept().await else {
                break;
            };
            let _ = ipc::serve_connection(stream, &handler).await;
        }
    });

    Fixture {
        engine,
        clock,
        client: IpcClient::with_socket_path(socket_path).with_max_retries(1),
        _events: rx,
        _server: server_handle,
    }
}

// ============================================================================
// Start / Pause / Reset
// ============================================================================

/// タイマー開始（IPC経由）
///
/// 期待結果: Focusタイマーが開始され、タスク名と残り時間が返る
#[tokio::test]
async fn ipc_start_runs_focus_timer() {
    let fixture = start_fixture(TimerSettings::default()).await;

    let response = fixture
        .client
        .start(Some("Integration Test Task".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status, "success");
    assert_eq!(response.message, "タイマーを開始しました");
    let data = response.data.expect("Response should contain data");
    assert_eq!(data.kind.as_deref(), Some("focus"));
    assert_eq!(data.is_running, Some(true));
    assert_eq!(data.remaining_seconds, Some(25 * 60));
    assert_eq!(data.task_name.as_deref(), Some("Integration Test Task"));

    assert!(fixture.engine.lock().await.is_running());
}

/// 実行中のタイマーを再度開始しても成功扱いで情報メッセージが返る
#[tokio::test]
async fn ipc_start_twice_reports_already_running() {
    let fixture = start_fixture(TimerSettings::default()).await;

    fixture.client.start(None).await.unwrap();
    let response = fixture.client.start(None).await.unwrap();

    assert_eq!(response.status, "success");
    assert_eq!(response.message, "タイマーは既に実行中です");
}

/// 一時停止は経過時間を保持する
#[tokio::test]
async fn ipc_pause_keeps_elapsed_time() {
    let fixture = start_fixture(TimerSettings::default()).await;

    fixture.client.start(None).await.unwrap();
    fixture.clock.advance_secs(100);
    let response = fixture.client.pause().await.unwrap();

    assert_eq!(response.message, "タイマーを一時停止しました");
    let data = response.data.unwrap();
    assert_eq!(data.is_running, Some(false));
    assert_eq!(data.remaining_seconds, Some(1400));

    // Paused time does not advance
    fixture.clock.advance_secs(300);
    let status = fixture.client.status().await.unwrap();
    assert_eq!(status.data.unwrap().remaining_seconds, Some(1400));
}

/// 停止中の一時停止は何もしない
#[tokio::test]
async fn ipc_pause_when_idle_is_informational() {
    let fixture = start_fixture(TimerSettings::default()).await;

    let response = fixture.client.pause().await.unwrap();

    assert_eq!(response.status, "success");
    assert_eq!(response.message, "タイマーは実行されていません");
}

/// リセットで残り時間が設定値に戻る
#[tokio::test]
async fn ipc_reset_restores_full_duration() {
    let fixture = start_fixture(TimerSettings::default()).await;

    fixture.client.start(None).await.unwrap();
    fixture.clock.advance_secs(600);
    let response = fixture.client.reset(false).await.unwrap();

    let data = response.data.unwrap();
    assert_eq!(data.is_running, Some(false));
    assert_eq!(data.remaining_seconds, Some(1500));
}

// ============================================================================
// Switch / Status
// ============================================================================

/// 切り替えで各タイマーの状態が独立して保持される
#[tokio::test]
async fn ipc_switch_keeps_slots_independent() {
    let fixture = start_fixture(TimerSettings::default()).await;

    fixture.client.start(None).await.unwrap();
    fixture.clock.advance_secs(60);
    fixture.client.pause().await.unwrap();

    let response = fixture.client.switch(TimerKind::ShortBreak).await.unwrap();
    let data = response.data.unwrap();
    assert_eq!(data.kind.as_deref(), Some("short_break"));
    assert_eq!(data.remaining_seconds, Some(300));

    let response = fixture.client.switch(TimerKind::Focus).await.unwrap();
    assert_eq!(response.data.unwrap().remaining_seconds, Some(1440));
}

/// ステータスは現在の状態をそのまま返す
#[tokio::test]
async fn ipc_status_reports_progress() {
    let fixture = start_fixture(TimerSettings::default()).await;

    fixture.client.start(None).await.unwrap();
    fixture.clock.advance_secs(90);

    let response = fixture.client.status().await.unwrap();
    let data = response.data.unwrap();
    assert_eq!(data.is_running, Some(true));
    assert_eq!(data.remaining_seconds, Some(1410));
    assert_eq!(data.duration_seconds, Some(1500));
    assert_eq!(data.completed_focus_count, Some(0));
}

// ============================================================================
// Settings
// ============================================================================

/// 実行中のタイマーは経過時間を保ったまま新しい長さに合わせられる
#[tokio::test]
async fn ipc_settings_reconciles_running_slot() {
    let fixture = start_fixture(TimerSettings::default()).await;

    fixture.client.start(None).await.unwrap();
    fixture.clock.advance_secs(600);

    let response = fixture
        .client
        .update_settings(SettingsParams {
            focus_minutes: Some(30),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(response.message, "設定を更新しました");
    let data = response.data.unwrap();
    assert_eq!(data.remaining_seconds, Some(1200));
    assert_eq!(data.duration_seconds, Some(1800));
    assert_eq!(data.is_running, Some(true));
    let settings = data.settings.unwrap();
    assert_eq!(settings.focus_minutes, 30);
    assert_eq!(settings.revision, 1);
}

/// 範囲外の設定はエラーになり、タイマーは変わらない
#[tokio::test]
async fn ipc_settings_rejects_invalid_values() {
    let fixture = start_fixture(TimerSettings::default()).await;

    let result = fixture
        .client
        .update_settings(SettingsParams {
            long_break_interval: Some(0),
            ..Default::default()
        })
        .await;

    assert!(result.unwrap_err().to_string().contains("1-12"));
    assert_eq!(
        fixture.engine.lock().await.settings().long_break_interval,
        4
    );
}

// ============================================================================
// Connection Handling
// ============================================================================

/// Daemon未起動時は接続エラーになる
#[tokio::test]
async fn ipc_connection_error_without_daemon() {
    let client = IpcClient::with_socket_path(create_temp_socket_path()).with_max_retries(1);

    let result = timeout(Duration::from_secs(5), client.status())
        .await
        .expect("client should give up quickly");

    assert!(result.is_err());
}

/// 不正なJSONにはエラーレスポンスが返る
#[tokio::test]
async fn ipc_malformed_request_gets_error_response() {
    let fixture = start_fixture(TimerSettings::default()).await;

    let mut stream = UnixStream::connect(fixture.client.socket_path())
        .await
        .unwrap();
    stream.write_all(b"{\"command\":\"fly\"}").await.unwrap();
    stream.shutdown().await.unwrap();

    let mut buffer = Vec::new();
    stream.read_to_end(&mut buffer).await.unwrap();
    let response: IpcResponse = serde_json::from_slice(&buffer).unwrap();

    assert_eq!(response.status, "error");
    assert!(!fixture.engine.lock().await.is_running());
}
