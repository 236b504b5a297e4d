//! Error types for the persistence layer.
//!
//! [`StoreError`] carries both the domain taxonomy that callers branch on
//! (not found, already exists, foreign key, integrity, validation) and the
//! infrastructure failures underneath it. Backend errors are classified into
//! the domain variants at the backend boundary, so callers never inspect
//! driver error strings.

use thiserror::Error;

/// Errors that can occur during persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A read, update or delete targeted zero rows.
    #[error("{entity} not found")]
    NotFound {
        /// Entity (table) name.
        entity: &'static str,
    },

    /// A write would duplicate a primary key or unique constraint.
    #[error("{entity} already exists: {detail}")]
    ResourceExists {
        /// Entity (table) name.
        entity: &'static str,
        /// Engine-provided detail.
        detail: String,
    },

    /// A write referenced a missing parent row, or removed a referenced one.
    #[error("{entity} violates a foreign key: {detail}")]
    ForeignKeyViolation {
        /// Entity (table) name.
        entity: &'static str,
        /// Engine-provided detail.
        detail: String,
    },

    /// Any other integrity-constraint failure (not null, check, …).
    #[error("integrity error on {entity}: {detail}")]
    Integrity {
        /// Entity (table) name.
        entity: &'static str,
        /// Engine-provided detail.
        detail: String,
    },

    /// Caller-supplied fields or filters do not match the entity schema.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stored row could not be mapped back into its entity.
    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        /// Table name.
        table: &'static str,
        /// Column name.
        column: &'static str,
        /// What went wrong.
        detail: String,
    },

    /// `SQLite` driver error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `PostgreSQL` driver error.
    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
