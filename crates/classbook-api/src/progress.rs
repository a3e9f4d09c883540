//! Handlers for curriculum progress.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/teaching-plans/{pid}/progress` | Optional `?sub_topic_id=&group_id=` |
//! | `POST` | `/teaching-plans/{pid}/progress/rebuild` | Replays every summary of the plan |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use classbook_core::{
  ids::{GroupId, SubTopicId, TeachingPlanId},
  progress::{ProgressQuery, ProgressSummary},
  store::SessionStore,
};
use serde::{Deserialize, Serialize};

use crate::{Ack, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub sub_topic_id: Option<SubTopicId>,
  pub group_id:     Option<GroupId>,
}

/// `GET /teaching-plans/{pid}/progress[?sub_topic_id=..][&group_id=..]`
pub async fn summaries<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(plan_id): Path<TeachingPlanId>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<Vec<ProgressSummary>>, ApiError> {
  let query = ProgressQuery {
    plan_id,
    sub_topic_id: params.sub_topic_id,
    group_id: params.group_id,
  };
  let summaries = store.progress_summaries(query).await.map_err(ApiError::store)?;
  Ok(Json(summaries))
}

#[derive(Debug, Serialize)]
pub struct Rebuilt {
  pub summaries: usize,
}

/// `POST /teaching-plans/{pid}/progress/rebuild`
pub async fn rebuild<S: SessionStore>(
  State(store): State<Arc<S>>,
  Path(plan_id): Path<TeachingPlanId>,
) -> Result<Json<Ack<TeachingPlanId, Rebuilt>>, ApiError> {
  let summaries = store.rebuild_progress(plan_id).await.map_err(ApiError::store)?;
  Ok(Json(Ack::with(plan_id, Rebuilt { summaries })))
}
