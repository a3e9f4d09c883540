//! JSON REST API for Classbook.
//!
//! Exposes an axum [`Router`] backed by any [`SessionStore`]. Auth, TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", classbook_api::api_router(store.clone()))
//! ```

pub mod body;
pub mod error;
pub mod ledger;
pub mod progress;
pub mod sessions;
pub mod steps;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use classbook_core::store::SessionStore;
use serde::Serialize;

pub use error::ApiError;

/// Body of every successful write: `{"success": true, "id": ..., "data": ...}`.
#[derive(Debug, Serialize)]
pub struct Ack<I, T = ()> {
  pub success: bool,
  pub id:      I,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<T>,
}

impl<I> Ack<I> {
  pub fn id(id: I) -> Self {
    Self { success: true, id, data: None }
  }
}

impl<I, T> Ack<I, T> {
  pub fn with(id: I, data: T) -> Self {
    Self { success: true, id, data: Some(data) }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: SessionStore + 'static,
{
  Router::new()
    // Session reports
    .route("/sessions", post(sessions::create::<S>))
    .route("/sessions/{id}", get(sessions::get_one::<S>).delete(sessions::delete_one::<S>))
    // Completion workflow
    .route("/sessions/{id}/steps", post(steps::save::<S>))
    .route("/sessions/{id}/progress", get(steps::progress::<S>))
    .route("/sessions/{id}/complete", post(steps::complete::<S>))
    .route(
      "/sessions/{id}/attendance",
      get(steps::list_attendance::<S>).put(steps::save_attendance::<S>),
    )
    .route("/sessions/{id}/feedback", put(steps::save_feedback::<S>))
    .route("/sessions/{id}/topic-coverage", put(steps::save_topic_coverage::<S>))
    // Per-group ledger
    .route(
      "/sessions/{id}/groups/{gid}/plan",
      get(ledger::get_plan::<S>).put(ledger::put_plan::<S>),
    )
    .route(
      "/sessions/{id}/groups/{gid}/execution",
      get(ledger::get_execution::<S>).put(ledger::put_execution::<S>),
    )
    .route(
      "/sessions/{id}/groups/{gid}/coverage",
      get(ledger::list_coverage::<S>).put(ledger::put_coverage::<S>),
    )
    // Curriculum progress
    .route("/teaching-plans/{pid}/progress", get(progress::summaries::<S>))
    .route("/teaching-plans/{pid}/progress/rebuild", post(progress::rebuild::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests;
