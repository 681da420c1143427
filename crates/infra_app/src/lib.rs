//! # infra_app
//!
//! The items service that runs as the container workload.
//!
//! - `GET /health` answers `{"status": "ok"}` without touching the database
//! - `POST /items?name=<name>` inserts one row into `items` and commits
//!
//! Connection settings come from `DB_HOST`, `DB_NAME`, `DB_USER`,
//! `DB_PASSWORD` and `DB_PORT`; the container definition injects them from
//! the database endpoint and its credential secret.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod store;

pub use config::DbOptions;
pub use error::{AppError, AppResult};
pub use routes::{build_router, AppState};
pub use server::serve;
pub use store::{ItemStore, MemoryItemStore, PgItemStore};
