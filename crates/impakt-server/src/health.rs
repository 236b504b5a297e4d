//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Run mode (`development` or `production`).
    pub environment: String,
    /// Storage backend name.
    pub database: String,
}

/// Build a health response.
pub fn health_check(start_time: Instant, environment: &str, database: &str) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        environment: environment.into(),
        database: database.into(),
    }
}
