//! Handlers for the completion workflow.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sessions/{id}/steps` | Body: [`StepSubmission`] |
//! | `GET`  | `/sessions/{id}/progress` | Completion progress |
//! | `POST` | `/sessions/{id}/complete` | 412 while a required step is empty |
//! | `PUT`  | `/sessions/{id}/attendance` | Body: `{"groups":[...]}` |
//! | `GET`  | `/sessions/{id}/attendance` | Attendance rows |
//! | `PUT`  | `/sessions/{id}/feedback` | Body: `{"groups":[...]}` |
//! | `PUT`  | `/sessions/{id}/topic-coverage` | Body: `{"groups":[...]}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use classbook_core::{
  attendance::{AttendanceRecord, GroupAttendance},
  coverage::GroupCoverage,
  ids::SessionId,
  ledger::GroupFeedback,
  session::SessionReport,
  store::SessionStore,
  workflow::{CompletionProgress, StepSubmission},
};
use serde::Deserialize;

use crate::{Ack, body::JsonBody, error::ApiError};

type Saved = Json<Ack<SessionId, SessionReport>>;

/// Per-group step data, addressed as `groups[i]` in field errors.
#[derive(Debug, Deserialize)]
pub struct GroupsBody<T> {
  pub groups: Vec<T>,
}

/// `POST /sessions/{id}/steps`
pub async fn save<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<SessionId>,
  JsonBody(body): JsonBody<StepSubmission>,
) -> Result<Saved, ApiError> {
  let mark_completed = body.mark_completed;
  let payload = body.into_payload()?;
  let report = store
    .save_step(id, payload, mark_completed)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Ack::with(id, report)))
}

/// `GET /sessions/{id}/progress`
pub async fn progress<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<SessionId>,
) -> Result<Json<CompletionProgress>, ApiError> {
  let progress = store.completion_progress(id).await.map_err(ApiError::store)?;
  Ok(Json(progress))
}

/// `POST /sessions/{id}/complete`
pub async fn complete<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<SessionId>,
) -> Result<Saved, ApiError> {
  let report = store.mark_completed(id).await.map_err(ApiError::store)?;
  Ok(Json(Ack::with(id, report)))
}

/// `PUT /sessions/{id}/attendance`
pub async fn save_attendance<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<SessionId>,
  JsonBody(body): JsonBody<GroupsBody<GroupAttendance>>,
) -> Result<Saved, ApiError> {
  let report = store
    .save_attendance_step(id, body.groups)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Ack::with(id, report)))
}

/// `GET /sessions/{id}/attendance`
pub async fn list_attendance<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<SessionId>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
  let records = store.list_attendance(id).await.map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `PUT /sessions/{id}/feedback`
pub async fn save_feedback<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<SessionId>,
  JsonBody(body): JsonBody<GroupsBody<GroupFeedback>>,
) -> Result<Saved, ApiError> {
  let report = store
    .save_feedback_step(id, body.groups)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Ack::with(id, report)))
}

/// `PUT /sessions/{id}/topic-coverage`
pub async fn save_topic_coverage<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<SessionId>,
  JsonBody(body): JsonBody<GroupsBody<GroupCoverage>>,
) -> Result<Saved, ApiError> {
  let report = store
    .save_topic_coverage_step(id, body.groups)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Ack::with(id, report)))
}
