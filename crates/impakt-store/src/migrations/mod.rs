//! Schema migration runner.
//!
//! Migrations are embedded at compile time via [`include_str!`], one list per
//! [`Dialect`], and executed in version order. Each migration runs inside a
//! transaction, so a failure rolls back with no partial schema state.
//!
//! The `schema_version` table tracks which migrations have been applied.
//! Running the migrator is idempotent: already-applied versions are skipped.

use tracing::{debug, info};

use crate::errors::{Result, StoreError};
use crate::session::{Session, in_transaction};
use crate::sql::Dialect;

/// A single migration with a version number and SQL to execute.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const SQLITE_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Companies, initiatives and SDG hierarchy",
        sql: include_str!("sqlite/v001_init.sql"),
    },
    Migration {
        version: 2,
        description: "Company descriptions and foreign-key indexes",
        sql: include_str!("sqlite/v002_company_description.sql"),
    },
];

const POSTGRES_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Companies, initiatives and SDG hierarchy",
        sql: include_str!("postgres/v001_init.sql"),
    },
    Migration {
        version: 2,
        description: "Company descriptions and foreign-key indexes",
        sql: include_str!("postgres/v002_company_description.sql"),
    },
];

fn migrations_for(dialect: Dialect) -> &'static [Migration] {
    match dialect {
        Dialect::Sqlite => SQLITE_MIGRATIONS,
        Dialect::Postgres => POSTGRES_MIGRATIONS,
    }
}

/// Run all pending migrations on the given session.
///
/// Creates the `schema_version` table if it doesn't exist, then applies
/// each migration whose version exceeds the current maximum. Returns the
/// number of migrations applied.
pub fn run_migrations<S: Session + ?Sized>(session: &mut S) -> Result<u32> {
    ensure_version_table(session)?;
    let current = current_version(session)?;
    let mut applied = 0;

    for migration in migrations_for(session.dialect()) {
        if migration.version <= current {
            debug!(
                version = migration.version,
                description = migration.description,
                "migration already applied, skipping"
            );
            continue;
        }

        info!(
            version = migration.version,
            description = migration.description,
            backend = session.dialect().name(),
            "applying migration"
        );
        apply_migration(session, migration)?;
        applied += 1;
    }

    if applied > 0 {
        info!(applied, "migrations complete");
    }

    Ok(applied)
}

/// Return the highest applied migration version, or 0 if none.
pub fn current_version<S: Session + ?Sized>(session: &mut S) -> Result<u32> {
    let raw = session
        .query_i64("SELECT CAST(COALESCE(MAX(version), 0) AS BIGINT) FROM schema_version")
        .map_err(|e| StoreError::Migration {
            message: format!("failed to read schema_version: {e}"),
        })?
        .unwrap_or(0);
    u32::try_from(raw).map_err(|_| StoreError::Migration {
        message: format!("schema_version holds out-of-range version {raw}"),
    })
}

/// Return the latest migration version defined for a dialect.
pub fn latest_version(dialect: Dialect) -> u32 {
    migrations_for(dialect).last().map_or(0, |m| m.version)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal
// ─────────────────────────────────────────────────────────────────────────────

fn ensure_version_table<S: Session + ?Sized>(session: &mut S) -> Result<()> {
    session
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
               version     BIGINT PRIMARY KEY,
               applied_at  TEXT   NOT NULL,
               description TEXT
             );",
        )
        .map_err(|e| StoreError::Migration {
            message: format!("failed to create schema_version table: {e}"),
        })
}

fn apply_migration<S: Session + ?Sized>(session: &mut S, migration: &Migration) -> Result<()> {
    let record = format!(
        "INSERT INTO schema_version (version, applied_at, description) \
         VALUES ({}, CAST(CURRENT_TIMESTAMP AS TEXT), '{}');",
        migration.version,
        migration.description.replace('\'', "''")
    );

    in_transaction(session, |s| {
        s.execute_batch(migration.sql)?;
        s.execute_batch(&record)
    })
    .map_err(|e| StoreError::Migration {
        message: format!(
            "migration v{} ({}) failed: {e}",
            migration.version, migration.description
        ),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
