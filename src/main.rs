//! Pomodoro timer CLI
//!
//! Three timers share one daemon:
//! - 25 minutes of focus
//! - 5 minutes of short break
//! - 15 minutes of long break after every 4th focus session

use anyhow::Result;
use clap::{CommandFactory, Parser};

use pomodoro_engine::cli::{Cli, Commands, Display, IpcClient};
use pomodoro_engine::daemon::{self, DaemonConfig};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins over the verbose flag.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Start(args)) => {
            let response = IpcClient::new()?.start(args.task).await?;
            Display::show_start(&response);
        }
        Some(Commands::Pause) => {
            let response = IpcClient::new()?.pause().await?;
            Display::show_pause(&response);
        }
        Some(Commands::Reset { all }) => {
            let response = IpcClient::new()?.reset(all).await?;
            Display::show_reset(&response);
        }
        Some(Commands::Switch { kind }) => {
            let response = IpcClient::new()?.switch(kind).await?;
            Display::show_switch(&response);
        }
        Some(Commands::Status) => {
            let response = IpcClient::new()?.status().await?;
            Display::show_status(&response);
        }
        Some(Commands::Settings(args)) => {
            let response = IpcClient::new()?.update_settings(args.to_params()).await?;
            Display::show_settings(&response);
        }
        Some(Commands::Daemon) => {
            daemon::run(DaemonConfig::from_env()?).await?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
