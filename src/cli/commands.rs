//! Command definitions for the Pomodoro timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use clap::{Args, Parser, Subcommand};

use crate::types::{SettingsParams, TimerKind, MAX_TASK_NAME_LEN};

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro timer CLI
#[derive(Parser, Debug)]
#[command(
    name = "pomodoro",
    version,
    about = "ポモドーロタイマーCLI",
    long_about = "集中・短い休憩・長い休憩の3つのタイマーを管理するポモドーロタイマー。\n\
                  タイマーはデーモン上で動作し、再起動後も残り時間を維持します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start or resume the active timer
    Start(StartArgs),

    /// Pause the active timer
    Pause,

    /// Reset the active timer to its full duration
    Reset {
        /// Reset every timer and the completed focus count
        #[arg(short, long)]
        all: bool,
    },

    /// Switch the active timer (focus, short-break, long-break)
    Switch {
        /// Timer to make active
        #[arg(value_parser = parse_kind)]
        kind: TimerKind,
    },

    /// Show current timer status
    Status,

    /// Change timer settings
    Settings(SettingsArgs),

    /// Run as daemon (background service)
    Daemon,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Start Command Arguments
// ============================================================================

/// Arguments for the start command
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Task name for focus sessions
    #[arg(short, long, value_parser = validate_task_name)]
    pub task: Option<String>,
}

// ============================================================================
// Settings Command Arguments
// ============================================================================

/// Arguments for the settings command
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Focus duration in minutes (1-120)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub focus: Option<u32>,

    /// Short break duration in minutes (1-60)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub short_break: Option<u32>,

    /// Long break duration in minutes (1-60)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub long_break: Option<u32>,

    /// Focus sessions before a long break (1-12)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub interval: Option<u32>,

    /// Automatically start the next timer after a completion
    #[arg(short, long)]
    pub auto_cycle: Option<bool>,
}

impl SettingsArgs {
    /// Converts the arguments into an IPC settings update.
    pub fn to_params(&self) -> SettingsParams {
        SettingsParams {
            focus_minutes: self.focus,
            short_break_minutes: self.short_break,
            long_break_minutes: self.long_break,
            long_break_interval: self.interval,
            auto_cycle: self.auto_cycle,
        }
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates the task name.
///
/// - Must not be empty
/// - Must not exceed 100 characters
fn validate_task_name(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("タスク名は空にできません".to_string());
    }
    if s.chars().count() > MAX_TASK_NAME_LEN {
        return Err("タスク名は100文字以内にしてください".to_string());
    }
    Ok(s.to_string())
}

fn parse_kind(s: &str) -> Result<TimerKind, String> {
    s.parse()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["pomodoro"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_short_verbose_flag() {
            let cli = Cli::parse_from(["pomodoro", "-v", "status"]);
            assert!(cli.verbose);
        }

        #[test]
        fn test_parse_pause_command() {
            let cli = Cli::parse_from(["pomodoro", "pause"]);
            assert!(matches!(cli.command, Some(Commands::Pause)));
        }

        #[test]
        fn test_parse_reset_command() {
            let cli = Cli::parse_from(["pomodoro", "reset"]);
            assert!(matches!(cli.command, Some(Commands::Reset { all: false })));

            let cli = Cli::parse_from(["pomodoro", "reset", "--all"]);
            assert!(matches!(cli.command, Some(Commands::Reset { all: true })));
        }

        #[test]
        fn test_parse_switch_command() {
            let cli = Cli::parse_from(["pomodoro", "switch", "long-break"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Switch {
                    kind: TimerKind::LongBreak
                })
            ));
        }

        #[test]
        fn test_parse_switch_unknown_kind() {
            let result = Cli::try_parse_from(["pomodoro", "switch", "nap"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_parse_daemon_command() {
            let cli = Cli::parse_from(["pomodoro", "daemon"]);
            assert!(matches!(cli.command, Some(Commands::Daemon)));
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["pomodoro", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Start Command Tests
    // ------------------------------------------------------------------------

    mod start_args_tests {
        use super::*;

        #[test]
        fn test_parse_start_without_task() {
            let cli = Cli::parse_from(["pomodoro", "start"]);
            match cli.command {
                Some(Commands::Start(args)) => assert!(args.task.is_none()),
                _ => panic!("Expected Start command"),
            }
        }

        #[test]
        fn test_parse_start_with_task() {
            let cli = Cli::parse_from(["pomodoro", "start", "--task", "Refactor"]);
            match cli.command {
                Some(Commands::Start(args)) => {
                    assert_eq!(args.task, Some("Refactor".to_string()));
                }
                _ => panic!("Expected Start command"),
            }
        }

        #[test]
        fn test_validate_task_name() {
            assert!(validate_task_name("").is_err());
            assert!(validate_task_name(&"a".repeat(101)).is_err());
            assert!(validate_task_name(&"あ".repeat(100)).is_ok());
        }
    }

    // ------------------------------------------------------------------------
    // Settings Command Tests
    // ------------------------------------------------------------------------

    mod settings_args_tests {
        use super::*;

        #[test]
        fn test_parse_settings() {
            let cli = Cli::parse_from([
                "pomodoro",
                "settings",
                "--focus",
                "27",
                "--interval",
                "3",
                "--auto-cycle",
                "true",
            ]);
            match cli.command {
                Some(Commands::Settings(args)) => {
                    let params = args.to_params();
                    assert_eq!(params.focus_minutes, Some(27));
                    assert_eq!(params.long_break_interval, Some(3));
                    assert_eq!(params.auto_cycle, Some(true));
                    assert_eq!(params.short_break_minutes, None);
                }
                _ => panic!("Expected Settings command"),
            }
        }

        #[test]
        fn test_parse_settings_out_of_range() {
            let result = Cli::try_parse_from(["pomodoro", "settings", "--focus", "0"]);
            assert!(result.is_err());

            let result = Cli::try_parse_from(["pomodoro", "settings", "--interval", "13"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_empty_settings_is_empty_params() {
            let cli = Cli::parse_from(["pomodoro", "settings"]);
            match cli.command {
                Some(Commands::Settings(args)) => assert!(args.to_params().is_empty()),
                _ => panic!("Expected Settings command"),
            }
        }
    }
}
