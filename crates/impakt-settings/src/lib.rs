//! # impakt-settings
//!
//! Layered environment configuration for the impakt backend.
//!
//! The run mode comes from `APP_ENV` (or the legacy `PYTHON_ENV`) and selects
//! which dotenv file is read. Values are layered in priority order:
//! 1. **Compiled defaults**: [`Settings::defaults_for`]
//! 2. **Mode file**: `.env.development` or `.env.production`
//! 3. **Local file**: `.env.local`
//! 4. **Process environment** (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from, resolve_environment};
pub use types::*;
