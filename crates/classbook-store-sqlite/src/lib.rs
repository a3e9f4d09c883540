//! SQLite backend for the Classbook session ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every write runs in one
//! `IMMEDIATE` transaction; progress recomputation happens inside the same
//! transaction as the coverage write that triggered it.

mod attendance;
mod catalog;
mod coverage;
mod encode;
mod ledger;
mod progress;
mod reports;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
