//! # impakt-store
//!
//! Entity schemas and a generic persistence layer for the impakt backend.
//!
//! - **Schema layer**: static [`EntitySchema`] metadata bound to typed structs
//!   through the [`Entity`] trait. No runtime reflection.
//! - **Generic CRUD**: [`crud::create`], [`crud::get`], [`crud::get_all`],
//!   [`crud::update`] and [`crud::delete`] work for every entity without any
//!   per-entity code.
//! - **Sessions**: an explicit [`Session`] is passed to every operation. Each
//!   write runs in its own `BEGIN`/`COMMIT` and is rolled back on failure.
//! - **Backends**: `PostgreSQL` (`postgres` + `r2d2_postgres`) for production,
//!   `SQLite` (`rusqlite` + `r2d2_sqlite`) for development and tests.
//! - **Migrations**: versioned SQL per dialect, embedded at compile time.

#![deny(unsafe_code)]

pub mod crud;
pub mod database;
pub mod entities;
pub mod errors;
pub mod filter;
pub mod migrations;
pub mod pg;
pub mod schema;
pub mod session;
pub mod sql;
pub mod sqlite;
pub mod value;

pub use database::{AnySession, Database, DatabaseConfig};
pub use errors::{Result, StoreError};
pub use filter::Filter;
pub use migrations::{current_version, latest_version, run_migrations};
pub use schema::{Entity, EntitySchema, FieldDef, FieldType, ForeignKey};
pub use session::Session;
pub use sql::Dialect;
pub use value::{Record, Value};
