//! `SQLite` backend: connection pool and session.
//!
//! Uses `r2d2` connection pooling with the `r2d2_sqlite` manager. The
//! [`PragmaCustomizer`] runs on each new connection so that foreign keys are
//! enforced and WAL mode is on for file databases.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::{Connection, ErrorCode, OptionalExtension, ToSql, ffi};
use tracing::warn;

use crate::errors::{Result, StoreError};
use crate::schema::{EntitySchema, FieldType};
use crate::session::Session;
use crate::sql::{Bind, Dialect, Statement};
use crate::value::{Record, TIMESTAMP_FORMAT, Value};

/// Alias for the `SQLite` connection pool type.
pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Alias for a pooled `SQLite` connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Configuration for the `SQLite` pool.
#[derive(Clone, Debug)]
pub struct SqliteConfig {
    /// Maximum pool size (default: 8). In-memory pools always use 1.
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 5000).
    pub busy_timeout_ms: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA foreign_keys = ON;",
            self.busy_timeout_ms
        ))
    }
}

/// Create an in-memory pool.
///
/// Every `SQLite` memory connection is its own database, so the pool holds a
/// single connection that is never recycled.
pub fn new_in_memory(config: &SqliteConfig) -> Result<SqlitePool> {
    let pool = Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(PragmaCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(SqliteConnectionManager::memory())?;
    Ok(pool)
}

/// Create a file-backed pool, creating the file if needed.
pub fn new_file(path: &str, config: &SqliteConfig) -> Result<SqlitePool> {
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(PragmaCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(SqliteConnectionManager::file(path))?;
    Ok(pool)
}

/// Pragma state for verification.
#[derive(Debug)]
pub struct PragmaState {
    /// Journal mode (`wal` for files, `memory` for in-memory databases).
    pub journal_mode: String,
    /// Whether foreign keys are enforced.
    pub foreign_keys_enabled: bool,
}

/// Read back the pragmas the customizer sets.
pub fn pragma_state(conn: &Connection) -> Result<PragmaState> {
    let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
    Ok(PragmaState {
        journal_mode,
        foreign_keys_enabled: foreign_keys == 1,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// A session over one pooled `SQLite` connection.
pub struct SqliteSession {
    conn: PooledConnection,
    open_tx: bool,
}

impl SqliteSession {
    /// Check a connection out of the pool.
    pub fn open(pool: &SqlitePool) -> Result<Self> {
        Ok(Self {
            conn: pool.get()?,
            open_tx: false,
        })
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Session for SqliteSession {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        self.open_tx = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open_tx = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.open_tx {
            return Ok(());
        }
        self.open_tx = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn query(&mut self, schema: &'static EntitySchema, stmt: &Statement) -> Result<Vec<Record>> {
        let err = |e| classify_error(schema.name, e);
        let mut prepared = self.conn.prepare(&stmt.sql).map_err(err)?;
        let params = rusqlite::params_from_iter(stmt.params.iter().map(SqliteParam));
        let mut rows = prepared.query(params).map_err(err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(err)? {
            out.push(read_row(schema, row)?);
        }
        Ok(out)
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn query_i64(&mut self, sql: &str) -> Result<Option<i64>> {
        let value = self
            .conn
            .query_row(sql, [], |row| row.get::<_, Option<i64>>(0))
            .optional()?;
        Ok(value.flatten())
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.open_tx {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback on session drop failed");
            }
        }
    }
}

struct SqliteParam<'a>(&'a Bind);

impl ToSql for SqliteParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match &self.0.value {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Timestamp(ts) => {
                ToSqlOutput::Owned(SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
            }
        })
    }
}

fn read_row(schema: &'static EntitySchema, row: &rusqlite::Row<'_>) -> Result<Record> {
    let mut record = Record::new();
    for (idx, field) in schema.fields.iter().enumerate() {
        let value: Value = match field.ty {
            FieldType::Integer => row.get::<_, Option<i64>>(idx)?.into(),
            FieldType::Text | FieldType::Enum(_) => row.get::<_, Option<String>>(idx)?.into(),
            FieldType::Timestamp => match row.get::<_, Option<String>>(idx)? {
                None => Value::Null,
                Some(raw) => Value::parse_str(field, &raw).map_err(|e| StoreError::CorruptRow {
                    table: schema.name,
                    column: field.name,
                    detail: e.to_string(),
                })?,
            },
        };
        record.insert(field.name, value);
    }
    Ok(record)
}

fn classify_error(entity: &'static str, err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            return classify_constraint(entity, failure.extended_code, detail);
        }
    }
    StoreError::Sqlite(err)
}

/// Map an extended `SQLite` constraint code onto the domain taxonomy.
pub fn classify_constraint(entity: &'static str, extended_code: i32, detail: String) -> StoreError {
    match extended_code {
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => StoreError::ForeignKeyViolation { entity, detail },
        ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
            StoreError::ResourceExists { entity, detail }
        }
        _ => StoreError::Integrity { entity, detail },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{COMPANY, SDG};
    use crate::filter::Filter;
    use crate::sql;
    use assert_matches::assert_matches;

    fn company_table(session: &mut SqliteSession) {
        session
            .execute_batch(
                "CREATE TABLE \"Company\" (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    stock_ticker TEXT,
                    website TEXT
                );",
            )
            .unwrap();
    }

    #[test]
    fn in_memory_pool_sets_pragmas() {
        let pool = new_in_memory(&SqliteConfig::default()).unwrap();
        assert_eq!(pool.max_size(), 1);
        let session = SqliteSession::open(&pool).unwrap();
        let state = pragma_state(session.connection()).unwrap();
        assert!(
            state.journal_mode == "memory" || state.journal_mode == "wal",
            "unexpected journal_mode: {}",
            state.journal_mode
        );
        assert!(state.foreign_keys_enabled);
    }

    #[test]
    fn file_pool_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("impakt.db");
        let config = SqliteConfig {
            pool_size: 2,
            ..SqliteConfig::default()
        };
        let pool = new_file(path.to_str().unwrap(), &config).unwrap();
        assert_eq!(pool.max_size(), 2);
        let session = SqliteSession::open(&pool).unwrap();
        let state = pragma_state(session.connection()).unwrap();
        assert_eq!(state.journal_mode, "wal");
        assert!(state.foreign_keys_enabled);
    }

    #[test]
    fn query_reads_typed_rows() {
        let pool = new_in_memory(&SqliteConfig::default()).unwrap();
        let mut session = SqliteSession::open(&pool).unwrap();
        company_table(&mut session);

        let record = Record::new().with("name", "Acme");
        let stmt = sql::insert(Dialect::Sqlite, &COMPANY, &record).unwrap();
        let rows = session.query(&COMPANY, &stmt).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
        assert_eq!(rows[0].get("website"), Some(&Value::Null));
    }

    #[test]
    fn primary_key_conflict_is_resource_exists() {
        let pool = new_in_memory(&SqliteConfig::default()).unwrap();
        let mut session = SqliteSession::open(&pool).unwrap();
        company_table(&mut session);

        let record = Record::new().with("id", 1).with("name", "Acme");
        let stmt = sql::insert(Dialect::Sqlite, &COMPANY, &record).unwrap();
        let _ = session.query(&COMPANY, &stmt).unwrap();
        assert_matches!(
            session.query(&COMPANY, &stmt),
            Err(StoreError::ResourceExists { entity: "Company", .. })
        );
    }

    #[test]
    fn dropping_session_rolls_back() {
        let pool = new_in_memory(&SqliteConfig::default()).unwrap();
        {
            let mut session = SqliteSession::open(&pool).unwrap();
            company_table(&mut session);
        }
        {
            let mut session = SqliteSession::open(&pool).unwrap();
            session.begin().unwrap();
            let stmt = sql::insert(Dialect::Sqlite, &COMPANY, &Record::new().with("name", "Ghost")).unwrap();
            let _ = session.query(&COMPANY, &stmt).unwrap();
        }
        let mut session = SqliteSession::open(&pool).unwrap();
        let stmt = sql::select(Dialect::Sqlite, &COMPANY, &Filter::new(), None).unwrap();
        assert!(session.query(&COMPANY, &stmt).unwrap().is_empty());
    }

    #[test]
    fn query_i64_handles_empty_and_null() {
        let pool = new_in_memory(&SqliteConfig::default()).unwrap();
        let mut session = SqliteSession::open(&pool).unwrap();
        assert_eq!(session.query_i64("SELECT 7").unwrap(), Some(7));
        assert_eq!(session.query_i64("SELECT NULL").unwrap(), None);
        session.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        assert_eq!(session.query_i64("SELECT x FROM t").unwrap(), None);
    }

    #[test]
    fn constraint_codes_classify() {
        assert_matches!(
            classify_constraint("SubSdg", ffi::SQLITE_CONSTRAINT_FOREIGNKEY, "fk".into()),
            StoreError::ForeignKeyViolation { entity: "SubSdg", .. }
        );
        assert_matches!(
            classify_constraint("Sdg", ffi::SQLITE_CONSTRAINT_UNIQUE, "dup".into()),
            StoreError::ResourceExists { .. }
        );
        assert_matches!(
            classify_constraint("Sdg", ffi::SQLITE_CONSTRAINT_NOTNULL, "null".into()),
            StoreError::Integrity { .. }
        );
        assert_matches!(
            classify_constraint("Sdg", ffi::SQLITE_CONSTRAINT_CHECK, "check".into()),
            StoreError::Integrity { entity: "Sdg", .. }
        );
    }

    #[test]
    fn rollback_without_transaction_is_noop() {
        let pool = new_in_memory(&SqliteConfig::default()).unwrap();
        let mut session = SqliteSession::open(&pool).unwrap();
        session.rollback().unwrap();
        let stmt = sql::select(Dialect::Sqlite, &SDG, &Filter::new(), None).unwrap();
        // Table does not exist yet.
        assert_matches!(session.query(&SDG, &stmt), Err(StoreError::Sqlite(_)));
    }
}
