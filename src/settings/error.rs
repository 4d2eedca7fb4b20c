//! Settings error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or updating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file.
    #[error("設定ファイルの読み込みに失敗しました ({path:?}): {source}")]
    Read {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Failed to write the settings file.
    #[error("設定ファイルの書き込みに失敗しました ({path:?}): {source}")]
    Write {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The settings file is not valid JSON.
    #[error("設定ファイルの形式が正しくありません ({path:?}): {source}")]
    Parse {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize settings.
    #[error("設定のシリアライズに失敗しました: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A value is outside its allowed range.
    #[error("{0}")]
    Invalid(String),
}

impl SettingsError {
    /// Returns true if the error comes from a rejected value rather than I/O.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_display_is_message() {
        let err = SettingsError::Invalid("作業時間は1-120分の範囲で指定してください".to_string());
        assert_eq!(err.to_string(), "作業時間は1-120分の範囲で指定してください");
        assert!(err.is_validation());
    }

    #[test]
    fn test_read_error_is_not_validation() {
        let err = SettingsError::Read {
            path: PathBuf::from("/tmp/settings.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!err.is_validation());
        assert!(err.to_string().contains("settings.json"));
    }
}
