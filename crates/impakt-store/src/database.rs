//! Backend selection and session dispatch.
//!
//! [`Database`] owns a connection pool for whichever backend was configured
//! and hands out [`AnySession`]s. It is cheap to clone; clones share the pool.

use tracing::info;

use crate::errors::Result;
use crate::pg::{self, PgConnectParams, PgPool, PgSession};
use crate::schema::EntitySchema;
use crate::session::Session;
use crate::sql::{Dialect, Statement};
use crate::sqlite::{self, SqliteConfig, SqlitePool, SqliteSession};
use crate::value::Record;

/// How to reach the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// A `SQLite` file, or `:memory:` for a private in-memory database.
    Sqlite {
        /// File path or `:memory:`.
        path: String,
        /// Maximum pooled connections.
        pool_size: u32,
    },
    /// A `PostgreSQL` server.
    Postgres {
        /// Connection parameters.
        params: PgConnectParams,
        /// Maximum pooled connections.
        pool_size: u32,
    },
}

/// A pooled database handle.
#[derive(Clone)]
pub enum Database {
    /// `SQLite` pool.
    Sqlite(SqlitePool),
    /// `PostgreSQL` pool.
    Postgres(PgPool),
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Database").field(&self.backend_name()).finish()
    }
}

impl Database {
    /// Build the pool described by `config`.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db = match config {
            DatabaseConfig::Sqlite { path, pool_size } => {
                let sqlite_config = SqliteConfig {
                    pool_size: *pool_size,
                    ..SqliteConfig::default()
                };
                if path == ":memory:" {
                    Database::Sqlite(sqlite::new_in_memory(&sqlite_config)?)
                } else {
                    Database::Sqlite(sqlite::new_file(path, &sqlite_config)?)
                }
            }
            DatabaseConfig::Postgres { params, pool_size } => {
                Database::Postgres(pg::new_pool(params, *pool_size)?)
            }
        };
        info!(backend = db.backend_name(), "database pool ready");
        Ok(db)
    }

    /// Private in-memory `SQLite` database.
    pub fn sqlite_in_memory() -> Result<Self> {
        Ok(Database::Sqlite(sqlite::new_in_memory(&SqliteConfig::default())?))
    }

    /// Check out a session.
    pub fn session(&self) -> Result<AnySession> {
        match self {
            Database::Sqlite(pool) => Ok(AnySession::Sqlite(SqliteSession::open(pool)?)),
            Database::Postgres(pool) => Ok(AnySession::Postgres(PgSession::open(pool)?)),
        }
    }

    /// SQL dialect of the backend.
    pub fn dialect(&self) -> Dialect {
        match self {
            Database::Sqlite(_) => Dialect::Sqlite,
            Database::Postgres(_) => Dialect::Postgres,
        }
    }

    /// Backend name for logs and health output.
    pub fn backend_name(&self) -> &'static str {
        self.dialect().name()
    }
}

/// A session on whichever backend the [`Database`] uses.
pub enum AnySession {
    /// `SQLite` session.
    Sqlite(SqliteSession),
    /// `PostgreSQL` session.
    Postgres(PgSession),
}

macro_rules! dispatch {
    ($self:ident, $s:ident => $body:expr) => {
        match $self {
            AnySession::Sqlite($s) => $body,
            AnySession::Postgres($s) => $body,
        }
    };
}

impl Session for AnySession {
    fn dialect(&self) -> Dialect {
        dispatch!(self, s => s.dialect())
    }

    fn begin(&mut self) -> Result<()> {
        dispatch!(self, s => s.begin())
    }

    fn commit(&mut self) -> Result<()> {
        dispatch!(self, s => s.commit())
    }

    fn rollback(&mut self) -> Result<()> {
        dispatch!(self, s => s.rollback())
    }

    fn query(&mut self, schema: &'static EntitySchema, stmt: &Statement) -> Result<Vec<Record>> {
        dispatch!(self, s => s.query(schema, stmt))
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        dispatch!(self, s => s.execute_batch(sql))
    }

    fn query_i64(&mut self, sql: &str) -> Result<Option<i64>> {
        dispatch!(self, s => s.query_i64(sql))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
