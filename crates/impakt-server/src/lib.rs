//! # impakt-server
//!
//! Axum REST surface over `impakt-store`.
//!
//! - Generic resource routes for every entity (create, list, find, get, update, delete)
//! - `/health` and `/hello` endpoints
//! - Store errors mapped to HTTP responses in one place ([`error::ApiError`])
//! - CORS and request tracing via `tower-http`
//! - Graceful shutdown via `CancellationToken`
//! - Pool setup and migrations off the async workers ([`startup`])

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod hello;
pub mod logging;
pub mod resources;
pub mod server;
pub mod shutdown;
pub mod startup;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{AppState, ImpaktServer};
pub use shutdown::ShutdownCoordinator;
pub use startup::{StartupError, close, connect, migrate};
