//! Core data types for the Pomodoro timer engine.
//!
//! This module defines the data structures used for:
//! - Per-kind timer slots and the aggregate engine state
//! - Timer settings with validation
//! - IPC request/response serialization

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upper bound for any slot duration (24 hours).
pub const MAX_DURATION_SECONDS: u32 = 24 * 60 * 60;

/// Maximum task name length in characters.
pub const MAX_TASK_NAME_LEN: usize = 100;

// ============================================================================
// TimerKind
// ============================================================================

/// The three independent timers the engine owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Focus (work) session
    #[default]
    Focus,
    /// Short break
    ShortBreak,
    /// Long break, scheduled every `long_break_interval` focus sessions
    LongBreak,
}

impl TimerKind {
    /// All kinds, in display order.
    pub const ALL: [TimerKind; 3] = [TimerKind::Focus, TimerKind::ShortBreak, TimerKind::LongBreak];

    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Focus => "focus",
            TimerKind::ShortBreak => "short_break",
            TimerKind::LongBreak => "long_break",
        }
    }

    /// Returns true for either break kind.
    pub fn is_break(&self) -> bool {
        !matches!(self, TimerKind::Focus)
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "focus" | "work" | "pomodoro" => Ok(TimerKind::Focus),
            "short_break" | "short" | "break" => Ok(TimerKind::ShortBreak),
            "long_break" | "long" => Ok(TimerKind::LongBreak),
            other => Err(format!("unknown timer kind: {other}")),
        }
    }
}

// ============================================================================
// TimerSettings
// ============================================================================

fn default_focus_minutes() -> u32 {
    25
}

fn default_short_break_minutes() -> u32 {
    5
}

fn default_long_break_minutes() -> u32 {
    15
}

fn default_long_break_interval() -> u32 {
    4
}

/// Timer settings, owned by the settings collaborator and read by the engine.
///
/// `revision` increases on every change; the engine reconciles its slots
/// only when it observes a revision newer than the one it last applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Focus duration in minutes (1-120)
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    /// Short break duration in minutes (1-60)
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    /// Long break duration in minutes (1-60)
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    /// Every Nth completed focus session is followed by a long break (1-12)
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    /// Whether the daemon starts the next slot after a completion
    #[serde(default)]
    pub auto_cycle: bool,
    /// Change marker, bumped on every update
    #[serde(default)]
    pub revision: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            long_break_interval: default_long_break_interval(),
            auto_cycle: false,
            revision: 0,
        }
    }
}

impl TimerSettings {
    /// Creates new settings with the specified focus duration.
    pub fn with_focus_minutes(mut self, minutes: u32) -> Self {
        self.focus_minutes = minutes;
        self
    }

    /// Creates new settings with the specified short break duration.
    pub fn with_short_break_minutes(mut self, minutes: u32) -> Self {
        self.short_break_minutes = minutes;
        self
    }

    /// Creates new settings with the specified long break duration.
    pub fn with_long_break_minutes(mut self, minutes: u32) -> Self {
        self.long_break_minutes = minutes;
        self
    }

    /// Creates new settings with the specified long break interval.
    pub fn with_long_break_interval(mut self, interval: u32) -> Self {
        self.long_break_interval = interval;
        self
    }

    /// Creates new settings with the specified revision.
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Configured duration for `kind` in seconds, clamped to `1..=MAX_DURATION_SECONDS`.
    pub fn duration_seconds(&self, kind: TimerKind) -> u32 {
        let minutes = match kind {
            TimerKind::Focus => self.focus_minutes,
            TimerKind::ShortBreak => self.short_break_minutes,
            TimerKind::LongBreak => self.long_break_minutes,
        };
        minutes.saturating_mul(60).clamp(1, MAX_DURATION_SECONDS)
    }

    /// Long break interval, never zero.
    pub fn effective_long_break_interval(&self) -> u32 {
        self.long_break_interval.max(1)
    }

    /// Validates the settings.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.focus_minutes < 1 || self.focus_minutes > 120 {
            return Err("作業時間は1-120分の範囲で指定してください".to_string());
        }
        if self.short_break_minutes < 1 || self.short_break_minutes > 60 {
            return Err("休憩時間は1-60分の範囲で指定してください".to_string());
        }
        if self.long_break_minutes < 1 || self.long_break_minutes > 60 {
            return Err("長い休憩時間は1-60分の範囲で指定してください".to_string());
        }
        if self.long_break_interval < 1 || self.long_break_interval > 12 {
            return Err("長い休憩の間隔は1-12の範囲で指定してください".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// TimerSlot
// ============================================================================

/// Per-kind timer state.
///
/// A slot is running iff it carries a start timestamp. While running, the
/// remaining time is derived from `start_epoch_millis`; `elapsed_seconds` is
/// only authoritative while paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSlot {
    /// Total configured length (>= 1)
    pub duration_seconds: u32,
    /// Wall-clock anchor of the last paused -> running transition
    pub start_epoch_millis: Option<i64>,
    /// Frozen elapsed time while paused (0..=duration_seconds)
    pub elapsed_seconds: u32,
}

impl TimerSlot {
    /// Creates an idle slot at full duration.
    pub fn new(duration_seconds: u32) -> Self {
        Self {
            duration_seconds: duration_seconds.clamp(1, MAX_DURATION_SECONDS),
            start_epoch_millis: None,
            elapsed_seconds: 0,
        }
    }

    /// Returns true if the slot is counting down.
    pub fn is_running(&self) -> bool {
        self.start_epoch_millis.is_some()
    }

    /// Elapsed whole seconds at `now_millis`, clamped to `0..=duration_seconds`.
    pub fn elapsed_at(&self, now_millis: i64) -> u32 {
        match self.start_epoch_millis {
            Some(start) => {
                let secs = now_millis.saturating_sub(start).max(0) / 1000;
                u32::try_from(secs)
                    .unwrap_or(u32::MAX)
                    .min(self.duration_seconds)
            }
            None => self.elapsed_seconds.min(self.duration_seconds),
        }
    }

    /// Remaining whole seconds at `now_millis`.
    pub fn remaining_at(&self, now_millis: i64) -> u32 {
        self.duration_seconds - self.elapsed_at(now_millis)
    }

    /// Anchors the start timestamp so that already-elapsed time is kept.
    pub(crate) fn start(&mut self, now_millis: i64) {
        let elapsed_millis = i64::from(self.elapsed_seconds) * 1000;
        self.start_epoch_millis = Some(now_millis - elapsed_millis);
    }

    /// Freezes elapsed time and clears the start timestamp.
    pub(crate) fn pause(&mut self, now_millis: i64) {
        self.elapsed_seconds = self.elapsed_at(now_millis);
        self.start_epoch_millis = None;
    }

    /// Returns the slot to full length with a new duration.
    pub(crate) fn reset(&mut self, duration_seconds: u32) {
        *self = Self::new(duration_seconds);
    }

    /// Marks a run as consumed: not running, nothing elapsed.
    pub(crate) fn finish(&mut self) {
        self.start_epoch_millis = None;
        self.elapsed_seconds = 0;
    }

    /// Applies a new duration while keeping the time already spent.
    ///
    /// Returns false, leaving the slot untouched, if the duration is unchanged.
    /// A running slot never drops below one remaining second here; completion
    /// is left for the next tick to observe.
    pub(crate) fn resize(&mut self, new_duration_seconds: u32, now_millis: i64) -> bool {
        let new_duration = new_duration_seconds.clamp(1, MAX_DURATION_SECONDS);
        if new_duration == self.duration_seconds {
            return false;
        }

        let elapsed = self.duration_seconds - self.remaining_at(now_millis);
        self.duration_seconds = new_duration;

        if self.is_running() {
            let remaining = new_duration.saturating_sub(elapsed).max(1);
            let consumed_millis = i64::from(new_duration - remaining) * 1000;
            self.start_epoch_millis = Some(now_millis - consumed_millis);
        } else {
            let remaining = new_duration.saturating_sub(elapsed);
            self.elapsed_seconds = new_duration - remaining;
        }
        true
    }
}

// ============================================================================
// TimerEngineState
// ============================================================================

/// Aggregate state owned exclusively by the timer engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEngineState {
    /// Focus slot
    pub focus: TimerSlot,
    /// Short break slot
    pub short_break: TimerSlot,
    /// Long break slot
    pub long_break: TimerSlot,
    /// Kind currently displayed and controlled
    pub active_kind: TimerKind,
    /// Completed focus sessions (drives long break scheduling)
    pub completed_focus_count: u32,
    /// Settings revision the slots were last reconciled against
    pub settings_revision: u64,
    /// Task attached to focus sessions
    pub task_name: Option<String>,
}

impl TimerEngineState {
    /// Creates the first-run state: every slot idle at full duration, Focus active.
    pub fn new(settings: &TimerSettings) -> Self {
        Self {
            focus: TimerSlot::new(settings.duration_seconds(TimerKind::Focus)),
            short_break: TimerSlot::new(settings.duration_seconds(TimerKind::ShortBreak)),
            long_break: TimerSlot::new(settings.duration_seconds(TimerKind::LongBreak)),
            active_kind: TimerKind::Focus,
            completed_focus_count: 0,
            settings_revision: settings.revision,
            task_name: None,
        }
    }

    /// Returns the slot for `kind`.
    pub fn slot(&self, kind: TimerKind) -> &TimerSlot {
        match kind {
            TimerKind::Focus => &self.focus,
            TimerKind::ShortBreak => &self.short_break,
            TimerKind::LongBreak => &self.long_break,
        }
    }

    /// Returns the slot for `kind` mutably.
    pub fn slot_mut(&mut self, kind: TimerKind) -> &mut TimerSlot {
        match kind {
            TimerKind::Focus => &mut self.focus,
            TimerKind::ShortBreak => &mut self.short_break,
            TimerKind::LongBreak => &mut self.long_break,
        }
    }

    /// Returns the active slot.
    pub fn active_slot(&self) -> &TimerSlot {
        self.slot(self.active_kind)
    }

    /// Returns the active slot mutably.
    pub fn active_slot_mut(&mut self) -> &mut TimerSlot {
        self.slot_mut(self.active_kind)
    }

    /// Kinds whose slot is currently running.
    pub fn running_kinds(&self) -> Vec<TimerKind> {
        TimerKind::ALL
            .into_iter()
            .filter(|kind| self.slot(*kind).is_running())
            .collect()
    }
}

// ============================================================================
// EngineSnapshot
// ============================================================================

/// Public view of the engine returned by every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    /// Active timer kind
    pub active_kind: TimerKind,
    /// Whether the active slot is running
    pub is_running: bool,
    /// Remaining seconds of the active slot
    pub remaining_seconds: u32,
    /// Configured duration of the active slot
    pub duration_seconds: u32,
    /// Completed focus sessions
    pub completed_focus_count: u32,
    /// Current task name (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
}

impl EngineSnapshot {
    /// Captures the public view of `state` at `now_millis`.
    pub fn capture(state: &TimerEngineState, now_millis: i64) -> Self {
        let slot = state.active_slot();
        Self {
            active_kind: state.active_kind,
            is_running: slot.is_running(),
            remaining_seconds: slot.remaining_at(now_millis),
            duration_seconds: slot.duration_seconds,
            completed_focus_count: state.completed_focus_count,
            task_name: state.task_name.clone(),
        }
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// Parameters for the start command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartParams {
    /// Task name
    #[serde(rename = "taskName", skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
}

/// Partial settings update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsParams {
    /// Focus duration in minutes
    #[serde(rename = "focusMinutes", skip_serializing_if = "Option::is_none")]
    pub focus_minutes: Option<u32>,
    /// Short break duration in minutes
    #[serde(rename = "shortBreakMinutes", skip_serializing_if = "Option::is_none")]
    pub short_break_minutes: Option<u32>,
    /// Long break duration in minutes
    #[serde(rename = "longBreakMinutes", skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<u32>,
    /// Long break interval
    #[serde(rename = "longBreakInterval", skip_serializing_if = "Option::is_none")]
    pub long_break_interval: Option<u32>,
    /// Auto cycle flag
    #[serde(rename = "autoCycle", skip_serializing_if = "Option::is_none")]
    pub auto_cycle: Option<bool>,
}

impl SettingsParams {
    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the set fields to `settings`.
    pub fn apply_to(&self, settings: &mut TimerSettings) {
        if let Some(v) = self.focus_minutes {
            settings.focus_minutes = v;
        }
        if let Some(v) = self.short_break_minutes {
            settings.short_break_minutes = v;
        }
        if let Some(v) = self.long_break_minutes {
            settings.long_break_minutes = v;
        }
        if let Some(v) = self.long_break_interval {
            settings.long_break_interval = v;
        }
        if let Some(v) = self.auto_cycle {
            settings.auto_cycle = v;
        }
    }
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// Start (or resume) the active timer
    Start {
        /// Start parameters
        #[serde(flatten)]
        params: StartParams,
    },
    /// Pause the active timer
    Pause,
    /// Reset the active timer, or the whole state with `all`
    Reset {
        /// Discard every slot and the focus count
        #[serde(default)]
        all: bool,
    },
    /// Make another timer kind active
    Switch {
        /// Target kind
        kind: TimerKind,
    },
    /// Query the current status
    Status,
    /// Update settings
    Settings {
        /// Settings fields to change
        #[serde(flatten)]
        params: SettingsParams,
    },
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    /// Active timer kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Whether the active timer is running
    #[serde(rename = "isRunning", skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
    /// Remaining seconds
    #[serde(rename = "remainingSeconds", skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u32>,
    /// Configured duration of the active timer
    #[serde(rename = "durationSeconds", skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// Completed focus sessions
    #[serde(rename = "completedFocusCount", skip_serializing_if = "Option::is_none")]
    pub completed_focus_count: Option<u32>,
    /// Current task name
    #[serde(rename = "taskName", skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    /// Current settings (settings command only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<TimerSettings>,
}

impl ResponseData {
    /// Creates response data from an engine snapshot.
    pub fn from_snapshot(snapshot: &EngineSnapshot) -> Self {
        Self {
            kind: Some(snapshot.active_kind.as_str().to_string()),
            is_running: Some(snapshot.is_running),
            remaining_seconds: Some(snapshot.remaining_seconds),
            duration_seconds: Some(snapshot.duration_seconds),
            completed_focus_count: Some(snapshot.completed_focus_count),
            task_name: snapshot.task_name.clone(),
            settings: None,
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
