//! Persistence adapter.
//!
//! Implements the [`tracker::ProjectStore`] trait on top of SQLite via
//! `rusqlite`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Owns the schema, its migrations and the mapping between
//! rows and tracker records. No domain rule lives here; every decision about
//! *what* to write is made by the [`tracker`] crate.
//!
//! ## Concurrency
//!
//! A single connection sits behind a mutex and every call runs on the blocking
//! thread pool. Each [`tracker::ProjectStore`] method is therefore atomic with
//! respect to every other call on the same [`SqliteStore`].

mod rows;
mod schema;
mod sqlite;

pub use schema::CURRENT_SCHEMA_VERSION;
pub use sqlite::SqliteStore;
