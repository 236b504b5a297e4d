//! # impakt
//!
//! impakt backend binary: loads settings, opens the database pool and either
//! serves the REST API or applies schema migrations.

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use impakt_server::logging::init_subscriber;
use impakt_server::{ImpaktServer, ServerConfig};
use impakt_settings::{DatabaseBackend, DatabaseSettings, Settings};
use impakt_store::pg::PgConnectParams;
use impakt_store::{Database, DatabaseConfig};

/// impakt REST backend.
#[derive(Parser, Debug)]
#[command(name = "impakt", about = "impakt REST backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the REST API until interrupted.
    Serve {
        /// Apply pending migrations before serving.
        #[arg(long)]
        migrate: bool,

        /// Host to bind (overrides `SERVER_HOST`).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides `SERVER_PORT`).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending schema migrations and exit.
    Migrate,
}

fn database_config(settings: &DatabaseSettings) -> DatabaseConfig {
    match settings.backend {
        DatabaseBackend::Sqlite => DatabaseConfig::Sqlite {
            path: settings.sqlite_path.clone(),
            pool_size: settings.pool_size,
        },
        DatabaseBackend::Postgres => DatabaseConfig::Postgres {
            params: PgConnectParams {
                host: settings.host.clone(),
                port: settings.port,
                user: settings.user.clone(),
                password: settings.password.clone(),
                database: settings.name.clone(),
            },
            pool_size: settings.pool_size,
        },
    }
}

async fn run(command: Command, settings: &Settings, db: Database) -> Result<()> {
    match command {
        Command::Migrate => {
            let _ = impakt_server::migrate(&db)
                .await
                .context("failed to apply migrations")?;
            Ok(())
        }
        Command::Serve {
            migrate: run_first,
            host,
            port,
        } => {
            if run_first {
                let _ = impakt_server::migrate(&db)
                    .await
                    .context("failed to apply migrations")?;
            }

            let mut config = ServerConfig::from(&settings.server);
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let server = ImpaktServer::new(config, db, settings.environment);
            let (addr, handle) = server
                .listen()
                .await
                .context("failed to bind the HTTP listener")?;
            tracing::info!(%addr, "impakt ready");

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl+c")?;

            server.shutdown().shutdown();
            let _ = handle.await;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings: Settings = impakt_settings::load_settings().context("failed to load settings")?;
    init_subscriber(&settings.log_level);
    tracing::info!(environment = %settings.environment, "starting impakt");

    let db = impakt_server::connect(database_config(&settings.database))
        .await
        .context("failed to connect to the database")?;

    let result = run(cli.command, &settings, db.clone()).await;
    // Last pool handle; pooled Postgres clients close on the blocking pool.
    impakt_server::close(db).await;
    result
}
