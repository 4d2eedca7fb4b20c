//! Timer engine for the Pomodoro timer.
//!
//! This module provides the core timer functionality:
//! - Three independent slots (focus, short break, long break)
//! - Remaining time derived from wall-clock timestamps, never from tick counts
//! - Start / pause / reset / switch transitions and completion
//! - Reconciliation of running or paused slots against edited settings
//! - Reload reconciliation and persistence after every mutation
//! - Long break after every `long_break_interval` focus sessions

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::store::{self, MemoryStore, StateStore, DEFAULT_STATE_KEY};
use crate::types::{EngineSnapshot, TimerEngineState, TimerKind, TimerSettings, MAX_TASK_NAME_LEN};

use super::clock::{Clock, SystemClock};

// ============================================================================
// TimerEvent
// ============================================================================

/// Bookkeeping record for one completed focus session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Unique session id
    pub id: Uuid,
    /// Completed kind (always Focus for the notification)
    pub kind: TimerKind,
    /// Task the session was attributed to
    pub task_name: Option<String>,
    /// Length of the completed session
    pub duration_seconds: u32,
    /// Wall-clock time the completion was observed
    pub completed_at_millis: i64,
    /// Focus count after this completion
    pub focus_count: u32,
}

/// Timer events for notifications and external integrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// The active slot started or resumed
    Started {
        /// Slot kind
        kind: TimerKind,
        /// Remaining seconds at start
        remaining_seconds: u32,
    },
    /// The active slot was paused
    Paused {
        /// Slot kind
        kind: TimerKind,
        /// Remaining seconds at pause
        remaining_seconds: u32,
    },
    /// The active slot was reset to full length
    Reset {
        /// Slot kind
        kind: TimerKind,
    },
    /// The active kind changed
    Switched {
        /// Previous kind
        from: TimerKind,
        /// New kind
        to: TimerKind,
    },
    /// A slot ran to zero
    Completed {
        /// Completed kind
        kind: TimerKind,
        /// Kind that became active
        next: TimerKind,
    },
    /// A focus session finished (task/history bookkeeping)
    FocusSessionCompleted(SessionRecord),
    /// Slots were reconciled against a new settings revision
    SettingsReconciled {
        /// Applied revision
        revision: u64,
        /// Kinds whose duration changed
        changed: Vec<TimerKind>,
    },
}

/// Outcome of a completion, returned by [`TimerEngine::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Kind that ran to zero
    pub kind: TimerKind,
    /// Kind that became active
    pub next: TimerKind,
}

// ============================================================================
// EngineContext
// ============================================================================

/// Collaborators injected into the engine.
#[derive(Clone)]
pub struct EngineContext {
    /// Persistence backend
    pub store: Arc<dyn StateStore>,
    /// Key of this engine's record; independent timers use distinct keys
    pub storage_key: String,
    /// Wall-clock source
    pub clock: Arc<dyn Clock>,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            storage_key: DEFAULT_STATE_KEY.to_string(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl EngineContext {
    /// Creates a context with the given store and clock and the default key.
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            storage_key: DEFAULT_STATE_KEY.to_string(),
        }
    }

    /// Uses `key` for this engine's record.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine that owns the Pomodoro timer state.
///
/// Every mutating operation persists the state afterwards. Operations whose
/// guard fails are inert and simply return the current snapshot.
pub struct TimerEngine {
    /// Current engine state
    state: TimerEngineState,
    /// Settings last applied
    settings: TimerSettings,
    /// Injected collaborators
    ctx: EngineContext,
    /// Event sender channel
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates an engine backed by an in-memory store and the system clock.
    pub fn new(settings: TimerSettings, event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self::open(settings, EngineContext::default(), event_tx)
    }

    /// Opens an engine, restoring persisted state when it is usable.
    ///
    /// A running slot whose time ran out while nothing was ticking completes
    /// here, before the engine is handed to any caller. Settings whose
    /// revision is newer than the stored one are reconciled afterwards.
    pub fn open(
        settings: TimerSettings,
        ctx: EngineContext,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let restored = store::load_state(ctx.store.as_ref(), &ctx.storage_key);
        let fresh = restored.is_none();
        let state = restored.unwrap_or_else(|| TimerEngineState::new(&settings));

        let mut engine = Self {
            settings: settings.clone(),
            state,
            ctx,
            event_tx,
        };

        if fresh {
            tracing::info!("Initialized default timer state");
            engine.persist();
        } else {
            engine.resume_after_reload();
        }
        engine.apply_settings(settings);
        engine
    }

    fn now(&self) -> i64 {
        self.ctx.clock.now_millis()
    }

    fn emit(&self, event: TimerEvent) {
        if let Err(e) = self.event_tx.send(event) {
            tracing::warn!("Failed to deliver timer event: {:?}", e.0);
        }
    }

    fn persist(&self) {
        store::save_state(self.ctx.store.as_ref(), &self.ctx.storage_key, &self.state);
    }

    fn resume_after_reload(&mut self) {
        let now = self.now();
        let slot = self.state.active_slot();
        if !slot.is_running() {
            return;
        }

        if slot.remaining_at(now) == 0 {
            tracing::info!(
                "{} finished while the timer was not running; completing",
                self.state.active_kind
            );
            self.complete(now);
        } else {
            tracing::info!(
                "Resuming running {} with {}s remaining",
                self.state.active_kind,
                slot.remaining_at(now)
            );
        }
    }

    /// Returns the public view of the engine.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::capture(&self.state, self.now())
    }

    /// Remaining seconds of the active slot.
    pub fn remaining_seconds(&self) -> u32 {
        self.state.active_slot().remaining_at(self.now())
    }

    /// Returns true if the active slot is running.
    pub fn is_running(&self) -> bool {
        self.state.active_slot().is_running()
    }

    /// Returns the active kind.
    pub fn active_kind(&self) -> TimerKind {
        self.state.active_kind
    }

    /// Returns the number of completed focus sessions.
    pub fn completed_focus_count(&self) -> u32 {
        self.state.completed_focus_count
    }

    /// Returns the settings last applied.
    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Returns a reference to the engine state.
    pub fn state(&self) -> &TimerEngineState {
        &self.state
    }

    /// Starts or resumes the active slot.
    ///
    /// Inert if the slot is already running or has no time left.
    pub fn start(&mut self) -> EngineSnapshot {
        let now = self.now();
        let kind = self.state.active_kind;
        let slot = self.state.active_slot_mut();

        if slot.is_running() {
            tracing::debug!("start ignored: {} already running", kind);
            return self.snapshot();
        }
        let remaining = slot.remaining_at(now);
        if remaining == 0 {
            tracing::debug!("start ignored: {} has no time left", kind);
            return self.snapshot();
        }

        slot.start(now);
        tracing::info!("Started {} with {}s remaining", kind, remaining);
        self.persist();
        self.emit(TimerEvent::Started {
            kind,
            remaining_seconds: remaining,
        });
        self.snapshot()
    }

    /// Pauses the active slot, freezing its elapsed time.
    ///
    /// Inert if the slot is not running.
    pub fn pause(&mut self) -> EngineSnapshot {
        let now = self.now();
        let kind = self.state.active_kind;
        let slot = self.state.active_slot_mut();

        if !slot.is_running() {
            tracing::debug!("pause ignored: {} not running", kind);
            return self.snapshot();
        }

        slot.pause(now);
        let remaining = slot.remaining_at(now);
        tracing::info!("Paused {} with {}s remaining", kind, remaining);
        self.persist();
        self.emit(TimerEvent::Paused {
            kind,
            remaining_seconds: remaining,
        });
        self.snapshot()
    }

    /// Resets the active slot to the currently configured duration.
    pub fn reset(&mut self) -> EngineSnapshot {
        let kind = self.state.active_kind;
        let duration = self.settings.duration_seconds(kind);
        self.state.active_slot_mut().reset(duration);

        tracing::info!("Reset {} to {}s", kind, duration);
        self.persist();
        self.emit(TimerEvent::Reset { kind });
        self.snapshot()
    }

    /// Discards the whole state, including the focus count.
    ///
    /// The stored record is removed before the fresh state is written.
    pub fn reset_all(&mut self) -> EngineSnapshot {
        let task_name = self.state.task_name.take();
        let revision = self.state.settings_revision;
        self.state = TimerEngineState::new(&self.settings);
        self.state.settings_revision = revision;
        self.state.task_name = task_name;

        if let Err(e) = self.ctx.store.remove(&self.ctx.storage_key) {
            tracing::warn!("Failed to remove timer state '{}': {}", self.ctx.storage_key, e);
        }
        tracing::info!("Reset all timers");
        self.persist();
        for kind in TimerKind::ALL {
            self.emit(TimerEvent::Reset { kind });
        }
        self.snapshot()
    }

    /// Makes `kind` the active slot.
    ///
    /// A running slot is paused first; the new slot is left as it was.
    pub fn switch_active(&mut self, kind: TimerKind) -> EngineSnapshot {
        if kind == self.state.active_kind {
            return self.snapshot();
        }
        if self.is_running() {
            self.pause();
        }
        self.switch_to(kind);
        self.persist();
        self.snapshot()
    }

    fn switch_to(&mut self, kind: TimerKind) {
        let from = self.state.active_kind;
        self.state.active_kind = kind;
        tracing::info!("Switched from {} to {}", from, kind);
        self.emit(TimerEvent::Switched { from, to: kind });
    }

    /// Sets or clears the task attached to focus sessions.
    pub fn set_task(&mut self, task_name: Option<String>) -> EngineSnapshot {
        let task_name = task_name.map(|name| name.chars().take(MAX_TASK_NAME_LEN).collect());
        if task_name != self.state.task_name {
            self.state.task_name = task_name;
            self.persist();
        }
        self.snapshot()
    }

    /// Checks the active slot for completion.
    ///
    /// Safe to call at any cadence and any number of times: a slot-run
    /// completes at most once because the slot stops running before any
    /// notification goes out.
    pub fn tick(&mut self) -> Option<Completion> {
        let now = self.now();
        let slot = self.state.active_slot();
        if !slot.is_running() || slot.remaining_at(now) > 0 {
            return None;
        }
        Some(self.complete(now))
    }

    fn complete(&mut self, now: i64) -> Completion {
        let kind = self.state.active_kind;
        let duration = self.state.active_slot().duration_seconds;
        self.state.active_slot_mut().finish();

        let next = if kind.is_break() {
            TimerKind::Focus
        } else {
            self.state.completed_focus_count += 1;
            let interval = self.settings.effective_long_break_interval();
            if self.state.completed_focus_count % interval == 0 {
                TimerKind::LongBreak
            } else {
                TimerKind::ShortBreak
            }
        };
        self.persist();

        tracing::info!("{} completed; next is {}", kind, next);
        if kind == TimerKind::Focus {
            self.emit(TimerEvent::FocusSessionCompleted(SessionRecord {
                id: Uuid::new_v4(),
                kind,
                task_name: self.state.task_name.clone(),
                duration_seconds: duration,
                completed_at_millis: now,
                focus_count: self.state.completed_focus_count,
            }));
        }
        self.emit(TimerEvent::Completed { kind, next });

        self.switch_to(next);
        self.persist();
        Completion { kind, next }
    }

    /// Applies settings if their revision is newer than the last one applied.
    ///
    /// Only slots whose duration actually changed are touched; each keeps
    /// the time already spent in it. Returns true if a reconciliation ran.
    pub fn apply_settings(&mut self, settings: TimerSettings) -> bool {
        if settings.revision <= self.state.settings_revision {
            tracing::debug!(
                "Settings revision {} already applied (at {})",
                settings.revision,
                self.state.settings_revision
            );
            return false;
        }

        let now = self.now();
        let mut changed = Vec::new();
        for kind in TimerKind::ALL {
            let duration = settings.duration_seconds(kind);
            if self.state.slot_mut(kind).resize(duration, now) {
                changed.push(kind);
            }
        }

        let revision = settings.revision;
        self.state.settings_revision = revision;
        self.settings = settings;
        self.persist();

        tracing::info!("Reconciled settings revision {}: {:?}", revision, changed);
        self.emit(TimerEvent::SettingsReconciled { revision, changed });
        true
    }

    /// Returns a mutable reference to the engine state (for testing).
    #[cfg(test)]
    pub fn get_state_mut(&mut self) -> &mut TimerEngineState {
        &mut self.state
    }
}

// ============================================================================
// Tests
// ============================================================================
