//! SQLite backends for the raw response and analysis result stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each store owns one connection, which
//! serialises its writes; every append runs inside a transaction.

mod encode;
mod raw;
mod results;
mod schema;

pub mod error;

pub use error::{Error, Result};
pub use raw::SqliteRawStore;
pub use results::SqliteResultStore;

#[cfg(test)]
mod tests;
