//! Pomodoro timer engine.
//!
//! This library provides the core of a Pomodoro timer:
//! - Three independent timers (focus, short break, long break) whose
//!   remaining time is derived from wall-clock timestamps
//! - Persistence of the timer state through a key-value store, so the
//!   timers survive a restart
//! - Reconciliation of running and paused timers when settings change
//! - A daemon with a Unix socket IPC server, and the CLI that talks to it

pub mod cli;
pub mod daemon;
pub mod paths;
pub mod settings;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use daemon::{
    Clock, Completion, EngineContext, ManualClock, SessionRecord, SystemClock, TimerEngine,
    TimerEvent,
};
pub use settings::{SettingsError, SettingsManager};
pub use store::{FileStore, MemoryStore, StateError, StateStore, StoreError};
pub use types::{
    EngineSnapshot, IpcRequest, IpcResponse, ResponseData, SettingsParams, StartParams,
    TimerEngineState, TimerKind, TimerSettings, TimerSlot,
};
