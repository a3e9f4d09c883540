//! Core types and trait definitions for the Classbook session ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the closed enumerations, field-level validation, the completion workflow
//! and the curriculum-progress aggregation algorithm. Storage backends
//! implement [`store::SessionStore`] on top of it.

// Backends implement the store traits with plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod attendance;
pub mod coverage;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod progress;
pub mod reference;
pub mod session;
pub mod store;
pub mod validate;
pub mod workflow;

pub use error::{Error, NotFound, Result};
