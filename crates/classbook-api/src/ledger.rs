//! Handlers for one group's plan, execution and coverage within a session.
//!
//! | Method    | Path | Notes |
//! |-----------|------|-------|
//! | `GET/PUT` | `/sessions/{id}/groups/{gid}/plan` | Body: [`GroupPlanInput`] |
//! | `GET/PUT` | `/sessions/{id}/groups/{gid}/execution` | Body: [`GroupExecutionInput`] |
//! | `GET/PUT` | `/sessions/{id}/groups/{gid}/coverage` | Body: `{"entries":[...]}`; replaces the group's rows |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use classbook_core::{
  coverage::{CoverageEntry, TopicCoverageRecord},
  ids::{GroupId, SessionId},
  ledger::{GroupExecution, GroupExecutionInput, GroupPlan, GroupPlanInput},
  store::SessionStore,
};
use serde::Deserialize;

use crate::{Ack, body::JsonBody, error::ApiError};

// ─── Plan ────────────────────────────────────────────────────────────────────

/// `GET /sessions/{id}/groups/{gid}/plan`
pub async fn get_plan<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path((id, group)): Path<(SessionId, GroupId)>,
) -> Result<Json<GroupPlan>, ApiError> {
  let plan = store
    .get_plan(id, group)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("plan for group {group} in session {id}")))?;
  Ok(Json(plan))
}

/// `PUT /sessions/{id}/groups/{gid}/plan`
pub async fn put_plan<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path((id, group)): Path<(SessionId, GroupId)>,
  JsonBody(body): JsonBody<GroupPlanInput>,
) -> Result<Json<Ack<SessionId, GroupPlan>>, ApiError> {
  let plan = store.upsert_plan(id, group, body).await.map_err(ApiError::store)?;
  Ok(Json(Ack::with(id, plan)))
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// `GET /sessions/{id}/groups/{gid}/execution`
pub async fn get_execution<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path((id, group)): Path<(SessionId, GroupId)>,
) -> Result<Json<GroupExecution>, ApiError> {
  let execution = store
    .get_execution(id, group)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("execution for group {group} in session {id}"))
    })?;
  Ok(Json(execution))
}

/// `PUT /sessions/{id}/groups/{gid}/execution`
pub async fn put_execution<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path((id, group)): Path<(SessionId, GroupId)>,
  JsonBody(body): JsonBody<GroupExecutionInput>,
) -> Result<Json<Ack<SessionId, GroupExecution>>, ApiError> {
  let execution = store
    .upsert_execution(id, group, body)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Ack::with(id, execution)))
}

// ─── Coverage ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CoverageBody {
  #[serde(default)]
  pub entries: Vec<CoverageEntry>,
}

/// `GET /sessions/{id}/groups/{gid}/coverage`
pub async fn list_coverage<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path((id, group)): Path<(SessionId, GroupId)>,
) -> Result<Json<Vec<TopicCoverageRecord>>, ApiError> {
  let records = store
    .list_coverage(id, Some(group))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `PUT /sessions/{id}/groups/{gid}/coverage`
pub async fn put_coverage<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path((id, group)): Path<(SessionId, GroupId)>,
  JsonBody(body): JsonBody<CoverageBody>,
) -> Result<Json<Ack<SessionId, Vec<TopicCoverageRecord>>>, ApiError> {
  let records = store
    .record_coverage(id, group, body.entries)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Ack::with(id, records)))
}
