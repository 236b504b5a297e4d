//! Settings loading from dotenv files and the process environment.
//!
//! The process environment decides the run mode. The matching `.env.<mode>`
//! file, then `.env.local`, then the process environment itself are layered
//! over compiled defaults. The result is a typed [`Settings`]; nothing is
//! written back into the process environment.

use std::collections::HashMap;
use std::path::Path;

use crate::errors::{Result, SettingsError};
use crate::types::{DatabaseBackend, Environment, Settings};

/// Variable holding the run mode.
pub const ENV_VAR: &str = "APP_ENV";

/// Legacy alias for [`ENV_VAR`].
pub const LEGACY_ENV_VAR: &str = "PYTHON_ENV";

/// Load settings from the current directory and the process environment.
pub fn load_settings() -> Result<Settings> {
    let vars: HashMap<String, String> = std::env::vars().collect();
    load_settings_from(Path::new("."), &vars)
}

/// Load settings from dotenv files under `dir`, with `process_env` on top.
pub fn load_settings_from(dir: &Path, process_env: &HashMap<String, String>) -> Result<Settings> {
    let environment = resolve_environment(process_env)?;

    let mut merged = HashMap::new();
    for file in [environment.env_file(), ".env.local"] {
        merged.extend(read_env_file(&dir.join(file))?);
    }
    merged.extend(process_env.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut settings = Settings::defaults_for(environment);
    apply_vars(&mut settings, &merged)?;
    tracing::debug!(environment = %environment, backend = ?settings.database.backend, "settings loaded");
    Ok(settings)
}

/// Determine the run mode from `APP_ENV`, falling back to `PYTHON_ENV`.
///
/// Unset means development; any other value than `development` or
/// `production` is an error.
pub fn resolve_environment(vars: &HashMap<String, String>) -> Result<Environment> {
    let raw = [ENV_VAR, LEGACY_ENV_VAR]
        .iter()
        .find_map(|key| vars.get(*key).filter(|v| !v.trim().is_empty()));
    match raw {
        None => Ok(Environment::default()),
        Some(value) => {
            Environment::parse(value).ok_or_else(|| SettingsError::InvalidEnvironment(value.clone()))
        }
    }
}

/// Read one dotenv file. A missing file yields no variables.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path)? {
        let (key, value) = item?;
        let _ = vars.insert(key, value);
    }
    tracing::debug!(path = %path.display(), count = vars.len(), "read env file");
    Ok(vars)
}

/// Apply recognised keys from `vars` over `settings`.
///
/// Numeric values are range-checked; invalid ones are ignored with a warning.
/// An unknown `DATABASE_BACKEND` is an error.
pub fn apply_vars(settings: &mut Settings, vars: &HashMap<String, String>) -> Result<()> {
    let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = get("DATABASE_BACKEND") {
        settings.database.backend = DatabaseBackend::parse(&v)
            .ok_or_else(|| SettingsError::InvalidValue(format!("DATABASE_BACKEND={v}")))?;
    }
    if let Some(v) = get("POSTGRES_HOST") {
        settings.database.host = v;
    }
    if let Some(v) = read_u16(vars, "POSTGRES_PORT", 1, 65535) {
        settings.database.port = v;
    }
    if let Some(v) = get("POSTGRES_USER") {
        settings.database.user = v;
    }
    if let Some(v) = vars.get("POSTGRES_PASSWORD") {
        settings.database.password.clone_from(v);
    }
    if let Some(v) = get("POSTGRES_DB") {
        settings.database.name = v;
    }
    if let Some(v) = get("SQLITE_PATH") {
        settings.database.sqlite_path = v;
    }
    if let Some(v) = read_u32(vars, "DB_POOL_SIZE", 1, 256) {
        settings.database.pool_size = v;
    }

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = get("SERVER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_u16(vars, "SERVER_PORT", 0, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = get("API_URL") {
        settings.server.cors_origin = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = get("LOG_LEVEL") {
        settings.log_level = v;
    }
    Ok(())
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_u16(vars: &HashMap<String, String>, name: &str, min: u16, max: u16) -> Option<u16> {
    let val = vars.get(name)?;
    let result = parse_u16_range(val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 setting, ignoring");
    }
    result
}

fn read_u32(vars: &HashMap<String, String>, name: &str, min: u32, max: u32) -> Option<u32> {
    let val = vars.get(name)?;
    let result = parse_u32_range(val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 setting, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
