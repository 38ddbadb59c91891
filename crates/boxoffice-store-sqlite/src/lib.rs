//! SQLite backend for the boxoffice booking engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write that depends on a prior
//! read (reserve, mark paid, validate ticket) runs inside a single
//! `BEGIN IMMEDIATE` transaction, backed by `UNIQUE` constraints.

mod encode;
mod queries;
mod schema;
mod seed;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_TIMEOUT, SqliteStore};
