//! Handlers for `/sessions` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/sessions` | Body: [`NewSession`]; returns 201 |
//! | `GET`    | `/sessions/{id}` | 404 if not found |
//! | `DELETE` | `/sessions/{id}` | Cascades and recomputes progress |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use classbook_core::{
  ids::SessionId,
  session::{NewSession, SessionReport},
  store::SessionStore,
};

use crate::{Ack, body::JsonBody, error::ApiError};

/// `POST /sessions`
pub async fn create<S: SessionStore>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<NewSession>,
) -> Result<impl IntoResponse, ApiError> {
  let report = store.create_session(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(Ack::with(report.session_id, report))))
}

/// `GET /sessions/{id}`
pub async fn get_one<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<SessionId>,
) -> Result<Json<SessionReport>, ApiError> {
  let report = store
    .get_session(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("session {id}")))?;
  Ok(Json(report))
}

/// `DELETE /sessions/{id}`
pub async fn delete_one<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<SessionId>,
) -> Result<Json<Ack<SessionId>>, ApiError> {
  if store.delete_session(id).await.map_err(ApiError::store)? {
    Ok(Json(Ack::id(id)))
  } else {
    Err(ApiError::NotFound(format!("session {id}")))
  }
}
