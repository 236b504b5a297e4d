//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A dotenv file exists but could not be read or parsed.
    #[error("failed to read env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    /// `APP_ENV` / `PYTHON_ENV` named an unknown mode.
    #[error("invalid environment `{0}`: expected `development` or `production`")]
    InvalidEnvironment(String),
    /// A settings value was invalid and has no safe fallback.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
