//! IPC Server for the Pomodoro timer daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer commands
//! - Integration with TimerEngine, the settings manager and the ticker

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

use crate::settings::SettingsManager;
use crate::types::{
    EngineSnapshot, IpcRequest, IpcResponse, ResponseData, SettingsParams, StartParams, TimerKind,
};

use super::ticker::{SharedEngine, Ticker};
use super::timer::TimerEngine;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Applies a read timeout to prevent blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE + 1];

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            anyhow::bail!("Connection closed by client");
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer[..n])
            .with_context(|| "Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the TimerEngine.
///
/// Every mutating request locks the ticker before the engine, then brings
/// the ticker in line with the resulting snapshot. The tick task itself only
/// ever takes the engine lock, so the order cannot deadlock.
pub struct RequestHandler {
    /// Shared reference to the timer engine
    engine: SharedEngine,
    /// Settings collaborator
    settings: Mutex<SettingsManager>,
    /// Completion-check task owner
    ticker: Mutex<Ticker>,
}

impl RequestHandler {
    /// Creates a new request handler with the given engine and settings.
    pub fn new(engine: SharedEngine, settings: SettingsManager) -> Self {
        let ticker = Ticker::new(engine.clone());
        Self {
            engine,
            settings: Mutex::new(settings),
            ticker: Mutex::new(ticker),
        }
    }

    /// Creates a handler with a custom ticker (for tests).
    pub fn with_ticker(engine: SharedEngine, settings: SettingsManager, ticker: Ticker) -> Self {
        Self {
            engine,
            settings: Mutex::new(settings),
            ticker: Mutex::new(ticker),
        }
    }

    async fn mutate<F>(&self, op: F) -> EngineSnapshot
    where
        F: FnOnce(&mut TimerEngine) -> EngineSnapshot,
    {
        let mut ticker = self.ticker.lock().await;
        let snapshot = {
            let mut engine = self.engine.lock().await;
            op(&mut engine)
        };
        ticker.sync(&snapshot);
        snapshot
    }

    /// Re-aligns the ticker with the engine (e.g. after a restore).
    pub async fn resync(&self) -> EngineSnapshot {
        self.mutate(|engine| engine.snapshot()).await
    }

    /// Cancels the ticker.
    pub async fn shutdown(&self) {
        self.ticker.lock().await.cancel();
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start { params } => self.handle_start(params).await,
            IpcRequest::Pause => self.handle_pause().await,
            IpcRequest::Reset { all } => self.handle_reset(all).await,
            IpcRequest::Switch { kind } => self.handle_switch(kind).await,
            IpcRequest::Status => self.handle_status().await,
            IpcRequest::Settings { params } => self.handle_settings(params).await,
        }
    }

    /// Handles the start command.
    async fn handle_start(&self, params: StartParams) -> IpcResponse {
        let mut was_running = false;
        let snapshot = self
            .mutate(|engine| {
                was_running = engine.is_running();
                if params.task_name.is_some() {
                    engine.set_task(params.task_name);
                }
                engine.start()
            })
            .await;

        let message = if was_running {
            "タイマーは既に実行中です"
        } else if snapshot.is_running {
            "タイマーを開始しました"
        } else {
            "残り時間がありません。リセットしてください"
        };
        IpcResponse::success(message, Some(ResponseData::from_snapshot(&snapshot)))
    }

    /// Handles the pause command.
    async fn handle_pause(&self) -> IpcResponse {
        let mut was_running = false;
        let snapshot = self
            .mutate(|engine| {
                was_running = engine.is_running();
                engine.pause()
            })
            .await;

        let message = if was_running {
            "タイマーを一時停止しました"
        } else {
            "タイマーは実行されていません"
        };
        IpcResponse::success(message, Some(ResponseData::from_snapshot(&snapshot)))
    }

    /// Handles the reset command.
    async fn handle_reset(&self, all: bool) -> IpcResponse {
        let snapshot = self
            .mutate(|engine| if all { engine.reset_all() } else { engine.reset() })
            .await;

        let message = if all {
            "すべてのタイマーをリセットしました"
        } else {
            "タイマーをリセットしました"
        };
        IpcResponse::success(message, Some(ResponseData::from_snapshot(&snapshot)))
    }

    /// Handles the switch command.
    async fn handle_switch(&self, kind: TimerKind) -> IpcResponse {
        let snapshot = self.mutate(|engine| engine.switch_active(kind)).await;
        IpcResponse::success(
            "タイマーを切り替えました",
            Some(ResponseData::from_snapshot(&snapshot)),
        )
    }

    /// Handles the status command.
    async fn handle_status(&self) -> IpcResponse {
        let snapshot = self.resync().await;
        IpcResponse::success("", Some(ResponseData::from_snapshot(&snapshot)))
    }

    /// Handles the settings command.
    async fn handle_settings(&self, params: SettingsParams) -> IpcResponse {
        let settings = {
            let mut manager = self.settings.lock().await;
            match manager.update(&params) {
                Ok(settings) => settings.clone(),
                Err(e) => return IpcResponse::error(e.to_string()),
            }
        };

        let applied = settings.clone();
        let snapshot = self
            .mutate(move |engine| {
                engine.apply_settings(applied);
                engine.snapshot()
            })
            .await;

        let mut data = ResponseData::from_snapshot(&snapshot);
        data.settings = Some(settings);
        IpcResponse::success("設定を更新しました", Some(data))
    }
}

/// Serves one connection: reads a request, dispatches it, writes the response.
pub async fn serve_connection(mut stream: UnixStream, handler: &RequestHandler) -> Result<()> {
    let response = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => {
            tracing::debug!("Received request: {:?}", request);
            handler.handle(request).await
        }
        Err(e) => IpcResponse::error(format!("不正なリクエストです: {e}")),
    };
    IpcServer::send_response(&mut stream, &response).await
}

// ============================================================================
// Tests
// ============================================================================
