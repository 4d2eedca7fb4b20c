//! Display utilities for the Pomodoro timer CLI.
//!
//! The daemon's message is shown as the headline; it already says whether
//! the command changed anything ("タイマーは既に実行中です" and the like).

use crate::types::{IpcResponse, ResponseData, TimerKind, TimerSettings};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the result of a start command.
    pub fn show_start(response: &IpcResponse) {
        println!("* {}", response.message);
        if let Some(data) = &response.data {
            for line in Self::timer_lines(data) {
                println!("  {}", line);
            }
        }
    }

    /// Shows the result of a pause command.
    pub fn show_pause(response: &IpcResponse) {
        println!("|| {}", response.message);
        if let Some(remaining) = response.data.as_ref().and_then(|d| d.remaining_seconds) {
            println!("  残り時間: {}", Self::format_clock(remaining));
        }
    }

    /// Shows the result of a reset command.
    pub fn show_reset(response: &IpcResponse) {
        println!("[] {}", response.message);
        if let Some(data) = &response.data {
            for line in Self::timer_lines(data) {
                println!("  {}", line);
            }
        }
    }

    /// Shows the result of a switch command.
    pub fn show_switch(response: &IpcResponse) {
        println!("> {}", response.message);
        if let Some(data) = &response.data {
            for line in Self::timer_lines(data) {
                println!("  {}", line);
            }
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        println!("ポモドーロタイマー ステータス");
        println!("─────────────────────────────");

        match &response.data {
            Some(data) => {
                for line in Self::status_lines(data) {
                    println!("{}", line);
                }
            }
            None => println!("タイマーは起動していません"),
        }
    }

    /// Shows the result of a settings command.
    pub fn show_settings(response: &IpcResponse) {
        println!("* {}", response.message);
        if let Some(settings) = response.data.as_ref().and_then(|d| d.settings.as_ref()) {
            for line in Self::settings_lines(settings) {
                println!("  {}", line);
            }
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Returns the Japanese label for a timer kind.
    fn kind_label(kind: &str) -> &str {
        match kind.parse::<TimerKind>() {
            Ok(TimerKind::Focus) => "集中",
            Ok(TimerKind::ShortBreak) => "短い休憩",
            Ok(TimerKind::LongBreak) => "長い休憩",
            Err(_) => kind,
        }
    }

    fn timer_lines(data: &ResponseData) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(kind) = &data.kind {
            lines.push(format!("タイマー: {}", Self::kind_label(kind)));
        }
        if let Some(task) = &data.task_name {
            lines.push(format!("タスク: {}", task));
        }
        if let Some(remaining) = data.remaining_seconds {
            lines.push(format!("残り時間: {}", Self::format_clock(remaining)));
        }
        lines
    }

    fn status_lines(data: &ResponseData) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(kind) = &data.kind {
            lines.push(format!("タイマー: {}", Self::kind_label(kind)));
        }
        let state = if data.is_running.unwrap_or(false) {
            "実行中"
        } else {
            "停止中"
        };
        lines.push(format!("状態: {}", state));

        if let Some(remaining) = data.remaining_seconds {
            match data.duration_seconds {
                Some(duration) => lines.push(format!(
                    "残り時間: {} / {}",
                    Self::format_clock(remaining),
                    Self::format_clock(duration)
                )),
                None => lines.push(format!("残り時間: {}", Self::format_clock(remaining))),
            }
        }
        if let Some(count) = data.completed_focus_count {
            lines.push(format!("完了した集中: {}回", count));
        }
        if let Some(task) = &data.task_name {
            lines.push(format!("タスク: {}", task));
        }
        lines
    }

    fn settings_lines(settings: &TimerSettings) -> Vec<String> {
        vec![
            format!("集中: {}分", settings.focus_minutes),
            format!("短い休憩: {}分", settings.short_break_minutes),
            format!("長い休憩: {}分", settings.long_break_minutes),
            format!("長い休憩までの集中回数: {}", settings.long_break_interval),
            format!(
                "自動サイクル: {}",
                if settings.auto_cycle { "有効" } else { "無効" }
            ),
        ]
    }

    /// Formats remaining seconds as (minutes, seconds).
    fn format_time(total_seconds: u32) -> (u32, u32) {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        (minutes, seconds)
    }

    fn format_clock(total_seconds: u32) -> String {
        let (minutes, seconds) = Self::format_time(total_seconds);
        format!("{}:{:02}", minutes, seconds)
    }
}

// ============================================================================
// Tests
// ============================================================================
