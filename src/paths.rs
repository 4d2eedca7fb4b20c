//! Filesystem locations used by the daemon and the CLI.
//!
//! Everything lives under `~/.pomodoro` unless `POMODORO_HOME` points
//! elsewhere.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "POMODORO_HOME";

/// Data directory name under the user's home.
const DATA_DIR_NAME: &str = ".pomodoro";

/// Returns the data directory.
///
/// # Errors
///
/// Returns an error if neither `POMODORO_HOME` nor a home directory is available.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("ホームディレクトリが見つかりません")?;
    Ok(home.join(DATA_DIR_NAME))
}

/// Returns the daemon socket path.
pub fn socket_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("pomodoro.sock"))
}

/// Returns the settings file path.
pub fn settings_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(crate::settings::SETTINGS_FILE_NAME))
}

/// Returns the directory holding persisted timer state.
pub fn state_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("state"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_data_dir() {
        let base = data_dir().unwrap();
        assert_eq!(socket_path().unwrap(), base.join("pomodoro.sock"));
        assert_eq!(settings_path().unwrap(), base.join("settings.json"));
        assert_eq!(state_dir().unwrap(), base.join("state"));
    }
}
