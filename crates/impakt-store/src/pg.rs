//! `PostgreSQL` backend: connection pool and session.
//!
//! Uses `r2d2` connection pooling with the `r2d2_postgres` manager over the
//! synchronous `postgres` client, mirroring the `SQLite` backend so both can
//! sit behind [`Session`].

use std::fmt;
use std::time::Duration;

use chrono::NaiveDateTime;
use postgres::types::ToSql;
use postgres::{Config, NoTls, Row};
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;
use tracing::warn;

use crate::errors::{Result, StoreError};
use crate::schema::{EntitySchema, FieldType};
use crate::session::Session;
use crate::sql::{Bind, Dialect, Statement};
use crate::value::{Record, Value};

/// Alias for the `PostgreSQL` connection pool type.
pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Alias for a pooled `PostgreSQL` connection.
pub type PooledConnection = r2d2::PooledConnection<PostgresConnectionManager<NoTls>>;

/// Connection parameters for a `PostgreSQL` server.
#[derive(Clone, PartialEq, Eq)]
pub struct PgConnectParams {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Role name.
    pub user: String,
    /// Role password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl fmt::Debug for PgConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

impl PgConnectParams {
    /// Driver configuration for these parameters.
    pub fn to_config(&self) -> Config {
        let mut config = Config::new();
        let _ = config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.database)
            .connect_timeout(Duration::from_secs(5));
        config
    }
}

/// Create a pool from connection parameters.
pub fn new_pool(params: &PgConnectParams, pool_size: u32) -> Result<PgPool> {
    build_pool(params.to_config(), pool_size)
}

/// Create a pool from a `postgres://` URL or key-value connection string.
pub fn new_pool_from_url(url: &str, pool_size: u32) -> Result<PgPool> {
    let config: Config = url.parse()?;
    build_pool(config, pool_size)
}

fn build_pool(config: Config, pool_size: u32) -> Result<PgPool> {
    let manager = PostgresConnectionManager::new(config, NoTls);
    let pool = Pool::builder()
        .max_size(pool_size)
        .connection_timeout(Duration::from_secs(5))
        .build(manager)?;
    Ok(pool)
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// A session over one pooled `PostgreSQL` connection.
pub struct PgSession {
    conn: PooledConnection,
    open_tx: bool,
}

impl PgSession {
    /// Check a connection out of the pool.
    pub fn open(pool: &PgPool) -> Result<Self> {
        Ok(Self {
            conn: pool.get()?,
            open_tx: false,
        })
    }
}

impl Session for PgSession {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.batch_execute("BEGIN")?;
        self.open_tx = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.batch_execute("COMMIT")?;
        self.open_tx = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.open_tx {
            return Ok(());
        }
        self.open_tx = false;
        self.conn.batch_execute("ROLLBACK")?;
        Ok(())
    }

    fn query(&mut self, schema: &'static EntitySchema, stmt: &Statement) -> Result<Vec<Record>> {
        let owned: Vec<Box<dyn ToSql + Sync>> = stmt.params.iter().map(to_pg_param).collect();
        let params: Vec<&(dyn ToSql + Sync)> = owned
            .iter()
            .map(|p| &**p as &(dyn ToSql + Sync))
            .collect();
        let rows = self
            .conn
            .query(stmt.sql.as_str(), &params)
            .map_err(|e| classify_error(schema.name, e))?;
        rows.iter().map(|row| read_row(schema, row)).collect()
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.conn.batch_execute(sql)?;
        Ok(())
    }

    fn query_i64(&mut self, sql: &str) -> Result<Option<i64>> {
        let row = self.conn.query_opt(sql, &[])?;
        match row {
            Some(row) => Ok(row.try_get::<_, Option<i64>>(0)?),
            None => Ok(None),
        }
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        if self.open_tx {
            if let Err(e) = self.conn.batch_execute("ROLLBACK") {
                warn!(error = %e, "rollback on session drop failed");
            }
        }
    }
}

/// Owned bind parameter; NULLs carry the column's type.
fn to_pg_param(bind: &Bind) -> Box<dyn ToSql + Sync> {
    match (&bind.value, bind.ty) {
        (Value::Integer(n), _) => Box::new(*n),
        (Value::Text(s), _) => Box::new(s.clone()),
        (Value::Timestamp(ts), _) => Box::new(*ts),
        (Value::Null, FieldType::Integer) => Box::new(None::<i64>),
        (Value::Null, FieldType::Text | FieldType::Enum(_)) => Box::new(None::<String>),
        (Value::Null, FieldType::Timestamp) => Box::new(None::<NaiveDateTime>),
    }
}

fn read_row(schema: &'static EntitySchema, row: &Row) -> Result<Record> {
    let mut record = Record::new();
    for (idx, field) in schema.fields.iter().enumerate() {
        let value: Value = match field.ty {
            FieldType::Integer => row.try_get::<_, Option<i64>>(idx)?.into(),
            FieldType::Text | FieldType::Enum(_) => row.try_get::<_, Option<String>>(idx)?.into(),
            FieldType::Timestamp => row.try_get::<_, Option<NaiveDateTime>>(idx)?.into(),
        };
        record.insert(field.name, value);
    }
    Ok(record)
}

fn classify_error(entity: &'static str, err: postgres::Error) -> StoreError {
    if let Some(db) = err.as_db_error() {
        let code = db.code().code();
        if code.starts_with("23") {
            let detail = match db.detail() {
                Some(detail) => format!("{}: {detail}", db.message()),
                None => db.message().to_string(),
            };
            return classify_sqlstate(entity, code, detail);
        }
    }
    StoreError::Postgres(err)
}

/// Map an integrity-class SQLSTATE onto the domain taxonomy.
pub fn classify_sqlstate(entity: &'static str, code: &str, detail: String) -> StoreError {
    match code {
        "23503" => StoreError::ForeignKeyViolation { entity, detail },
        "23505" => StoreError::ResourceExists { entity, detail },
        _ => StoreError::Integrity { entity, detail },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
