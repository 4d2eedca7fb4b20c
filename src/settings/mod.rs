//! Settings collaborator for the timer engine.
//!
//! [`SettingsManager`] owns the current [`TimerSettings`], persists them to
//! a JSON file and bumps `revision` on every accepted change so the engine
//! can tell a new configuration from one it already reconciled.

mod error;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use error::SettingsError;

use crate::types::{SettingsParams, TimerSettings};

/// Settings file name inside the data directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Owns and persists timer settings.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    /// Backing file; `None` keeps settings in memory only
    path: Option<PathBuf>,
    /// Current settings
    current: TimerSettings,
}

impl SettingsManager {
    /// Creates a manager that never touches the filesystem.
    pub fn in_memory(settings: TimerSettings) -> Self {
        Self {
            path: None,
            current: settings,
        }
    }

    /// Loads settings from `path`, using defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let current = match fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {:?}, using defaults", path);
                TimerSettings::default()
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.clone(),
                    source,
                })
            }
        };

        if let Err(message) = current.validate() {
            // Out-of-range values are clamped by the engine; keep going.
            tracing::warn!("Settings file {:?} holds invalid values: {}", path, message);
        }

        Ok(Self {
            path: Some(path),
            current,
        })
    }

    /// Returns the current settings.
    pub fn current(&self) -> &TimerSettings {
        &self.current
    }

    /// Returns the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Applies `params`, validates, bumps the revision and saves.
    ///
    /// An empty update changes nothing and keeps the revision.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range or the file cannot be
    /// written; the current settings are unchanged in both cases.
    pub fn update(&mut self, params: &SettingsParams) -> Result<&TimerSettings, SettingsError> {
        if params.is_empty() {
            return Ok(&self.current);
        }

        let mut next = self.current.clone();
        params.apply_to(&mut next);
        next.validate().map_err(SettingsError::Invalid)?;
        next.revision = self.current.revision + 1;

        self.write(&next)?;
        tracing::info!("Settings updated to revision {}", next.revision);
        self.current = next;
        Ok(&self.current)
    }

    /// Moves the revision past `applied` if the settings fell behind it.
    ///
    /// The engine persists the last revision it reconciled against. A lost
    /// or replaced settings file restarts the counter, and every later
    /// update would look stale to the engine. Returns true if the revision
    /// was bumped; the values themselves are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be written.
    pub fn catch_up_revision(&mut self, applied: u64) -> Result<bool, SettingsError> {
        if self.current.revision >= applied {
            return Ok(false);
        }

        let mut next = self.current.clone();
        next.revision = applied + 1;
        self.write(&next)?;
        tracing::warn!(
            "Settings revision {} is behind the applied revision {}; moved to {}",
            self.current.revision,
            applied,
            next.revision
        );
        self.current = next;
        Ok(true)
    }

    fn write(&self, settings: &TimerSettings) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: path.clone(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(settings).map_err(SettingsError::Serialize)?;
        fs::write(path, json).map_err(|source| SettingsError::Write {
            path: path.clone(),
            source,
        })
    }
}
