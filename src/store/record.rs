//! Serialized form of the engine state.
//!
//! Every field is optional at the serde level so that structurally
//! incomplete records parse and are rejected by validation with a precise
//! [`StateError`] instead of a generic parse failure.
//!
//! ```json
//! {
//!   "version": 1,
//!   "activeKind": "focus",
//!   "completedFocusCount": 3,
//!   "settingsRevision": 2,
//!   "slots": {
//!     "focus": {"durationSeconds": 1500, "startEpochMillis": 1700000000000,
//!               "elapsedSeconds": 0, "isRunning": true},
//!     "shortBreak": {...},
//!     "longBreak": {...}
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{TimerEngineState, TimerKind, TimerSlot, MAX_DURATION_SECONDS, MAX_TASK_NAME_LEN};

use super::error::StateError;

/// Current record format version.
pub const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotRecord {
    duration_seconds: Option<i64>,
    start_epoch_millis: Option<i64>,
    elapsed_seconds: Option<i64>,
    is_running: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotsRecord {
    focus: Option<SlotRecord>,
    short_break: Option<SlotRecord>,
    long_break: Option<SlotRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateRecord {
    version: Option<u32>,
    active_kind: Option<TimerKind>,
    completed_focus_count: Option<i64>,
    settings_revision: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_name: Option<String>,
    slots: Option<SlotsRecord>,
}

impl From<&TimerSlot> for SlotRecord {
    fn from(slot: &TimerSlot) -> Self {
        Self {
            duration_seconds: Some(i64::from(slot.duration_seconds)),
            start_epoch_millis: slot.start_epoch_millis,
            elapsed_seconds: Some(i64::from(slot.elapsed_seconds)),
            is_running: Some(slot.is_running()),
        }
    }
}

impl From<&TimerEngineState> for StateRecord {
    fn from(state: &TimerEngineState) -> Self {
        Self {
            version: Some(STATE_FORMAT_VERSION),
            active_kind: Some(state.active_kind),
            completed_focus_count: Some(i64::from(state.completed_focus_count)),
            settings_revision: Some(state.settings_revision),
            task_name: state.task_name.clone(),
            slots: Some(SlotsRecord {
                focus: Some((&state.focus).into()),
                short_break: Some((&state.short_break).into()),
                long_break: Some((&state.long_break).into()),
            }),
        }
    }
}

fn slot_field(kind: TimerKind) -> &'static str {
    match kind {
        TimerKind::Focus => "slots.focus",
        TimerKind::ShortBreak => "slots.shortBreak",
        TimerKind::LongBreak => "slots.longBreak",
    }
}

fn decode_slot(kind: TimerKind, record: Option<SlotRecord>) -> Result<TimerSlot, StateError> {
    let record = record.ok_or(StateError::MissingField(slot_field(kind)))?;

    let duration = record
        .duration_seconds
        .ok_or(StateError::MissingField("durationSeconds"))?;
    if duration < 1 || duration > i64::from(MAX_DURATION_SECONDS) {
        return Err(StateError::out_of_range(
            "durationSeconds",
            format!("{kind}: {duration} is not within 1..={MAX_DURATION_SECONDS}"),
        ));
    }

    let elapsed = record
        .elapsed_seconds
        .ok_or(StateError::MissingField("elapsedSeconds"))?;
    if elapsed < 0 || elapsed > duration {
        return Err(StateError::out_of_range(
            "elapsedSeconds",
            format!("{kind}: {elapsed} is not within 0..={duration}"),
        ));
    }

    let is_running = record.is_running.ok_or(StateError::MissingField("isRunning"))?;
    if is_running != record.start_epoch_millis.is_some() {
        return Err(StateError::out_of_range(
            "startEpochMillis",
            format!("{kind}: running flag and start timestamp disagree"),
        ));
    }

    // Both bounds were checked against u32 ranges above.
    Ok(TimerSlot {
        duration_seconds: duration as u32,
        start_epoch_millis: record.start_epoch_millis,
        elapsed_seconds: elapsed as u32,
    })
}

impl TryFrom<StateRecord> for TimerEngineState {
    type Error = StateError;

    fn try_from(record: StateRecord) -> Result<Self, Self::Error> {
        let version = record.version.unwrap_or(STATE_FORMAT_VERSION);
        if version != STATE_FORMAT_VERSION {
            return Err(StateError::UnsupportedVersion(version));
        }

        let active_kind = record.active_kind.ok_or(StateError::MissingField("activeKind"))?;

        let count = record
            .completed_focus_count
            .ok_or(StateError::MissingField("completedFocusCount"))?;
        let completed_focus_count = u32::try_from(count).map_err(|_| {
            StateError::out_of_range("completedFocusCount", format!("{count} is not a valid count"))
        })?;

        if let Some(task) = &record.task_name {
            if task.chars().count() > MAX_TASK_NAME_LEN {
                return Err(StateError::out_of_range(
                    "taskName",
                    format!("longer than {MAX_TASK_NAME_LEN} characters"),
                ));
            }
        }

        let mut slots = record.slots.ok_or(StateError::MissingField("slots"))?;
        let state = TimerEngineState {
            focus: decode_slot(TimerKind::Focus, slots.focus.take())?,
            short_break: decode_slot(TimerKind::ShortBreak, slots.short_break.take())?,
            long_break: decode_slot(TimerKind::LongBreak, slots.long_break.take())?,
            active_kind,
            completed_focus_count,
            settings_revision: record.settings_revision.unwrap_or(0),
            task_name: record.task_name,
        };

        if let Some(kind) = state
            .running_kinds()
            .into_iter()
            .find(|kind| *kind != active_kind)
        {
            return Err(StateError::out_of_range(
                "isRunning",
                format!("{kind} is running but {active_kind} is active"),
            ));
        }

        Ok(state)
    }
}

/// Parses and validates a persisted record.
pub fn decode_state(raw: &str) -> Result<TimerEngineState, StateError> {
    let record: StateRecord =
        serde_json::from_str(raw).map_err(|e| StateError::Parse(e.to_string()))?;
    TimerEngineState::try_from(record)
}

/// Serializes the state into its persisted record.
pub fn encode_state(state: &TimerEngineState) -> Result<String, StateError> {
    serde_json::to_string(&StateRecord::from(state)).map_err(|e| StateError::Serialize(e.to_string()))
}
