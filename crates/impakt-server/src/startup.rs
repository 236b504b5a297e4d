//! Opening the pool and applying migrations from async code.
//!
//! Both block, and the sync Postgres client drives its own runtime, so they
//! run on the blocking pool rather than on a Tokio worker.

use impakt_store::{Database, DatabaseConfig, StoreError, latest_version, run_migrations};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{info, warn};

/// Errors raised while preparing the database.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking task panicked or was cancelled.
    #[error("database startup task failed: {0}")]
    Task(#[from] JoinError),
}

/// Build the pool described by `config`.
pub async fn connect(config: DatabaseConfig) -> Result<Database, StartupError> {
    let db = tokio::task::spawn_blocking(move || Database::connect(&config)).await??;
    Ok(db)
}

/// Apply pending migrations. Returns how many were applied.
pub async fn migrate(db: &Database) -> Result<u32, StartupError> {
    let db = db.clone();
    let latest = latest_version(db.dialect());
    let applied = tokio::task::spawn_blocking(move || {
        let mut session = db.session()?;
        run_migrations(&mut session)
    })
    .await??;
    info!(applied, latest, "schema up to date");
    Ok(applied)
}

/// Release a pool handle off the async workers.
///
/// Dropping the last handle closes every pooled connection, which blocks for
/// Postgres clients.
pub async fn close(db: Database) {
    if let Err(e) = tokio::task::spawn_blocking(move || drop(db)).await {
        warn!(error = %e, "closing the database pool failed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
