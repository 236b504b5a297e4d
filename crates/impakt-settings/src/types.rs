//! Settings types and their compiled defaults.

use std::fmt;

/// Run mode of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development (default).
    #[default]
    Development,
    /// Deployed service.
    Production,
}

impl Environment {
    /// Lower-case name, as written in `APP_ENV`.
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Dotenv file read for this mode.
    pub fn env_file(self) -> &'static str {
        match self {
            Environment::Development => ".env.development",
            Environment::Production => ".env.production",
        }
    }

    /// Parse an `APP_ENV` value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "development" => Some(Environment::Development),
            "production" => Some(Environment::Production),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which storage engine to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseBackend {
    /// `PostgreSQL` server (default).
    #[default]
    Postgres,
    /// Local `SQLite` file.
    Sqlite,
}

impl DatabaseBackend {
    /// Parse a `DATABASE_BACKEND` value (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(DatabaseBackend::Postgres),
            "sqlite" => Some(DatabaseBackend::Sqlite),
            _ => None,
        }
    }
}

/// Database connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Storage engine.
    pub backend: DatabaseBackend,
    /// `PostgreSQL` host (`POSTGRES_HOST`).
    pub host: String,
    /// `PostgreSQL` port (`POSTGRES_PORT`).
    pub port: u16,
    /// `PostgreSQL` role (`POSTGRES_USER`).
    pub user: String,
    /// `PostgreSQL` password (`POSTGRES_PASSWORD`). Never logged.
    pub password: String,
    /// `PostgreSQL` database name (`POSTGRES_DB`).
    pub name: String,
    /// `SQLite` file path, or `:memory:` (`SQLITE_PATH`).
    pub sqlite_path: String,
    /// Maximum pooled connections (`DB_POOL_SIZE`).
    pub pool_size: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Postgres,
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: String::new(),
            name: "impakt".into(),
            sqlite_path: "impakt.db".into(),
            pool_size: 8,
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .field("sqlite_path", &self.sqlite_path)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Bind address (`SERVER_HOST`).
    pub host: String,
    /// Bind port (`SERVER_PORT`).
    pub port: u16,
    /// Allowed CORS origin (`API_URL`); any origin when unset.
    pub cors_origin: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            cors_origin: None,
        }
    }
}

/// Complete process settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Run mode.
    pub environment: Environment,
    /// Database connection.
    pub database: DatabaseSettings,
    /// HTTP listener.
    pub server: ServerSettings,
    /// Default log filter (`LOG_LEVEL`); `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Settings {
    /// Compiled defaults for a run mode.
    pub fn defaults_for(environment: Environment) -> Self {
        let log_level = match environment {
            Environment::Development => "debug",
            Environment::Production => "info",
        };
        Self {
            environment,
            database: DatabaseSettings::default(),
            server: ServerSettings::default(),
            log_level: log_level.into(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults_for(Environment::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
