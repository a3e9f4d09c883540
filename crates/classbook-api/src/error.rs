//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure renders as `{"success": false, "error": ..., "fields": [...]}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use classbook_core::{
  Error as DomainError,
  store::StoreError,
  validate::{FieldError, ValidationErrors},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("validation failed")]
  Validation(ValidationErrors),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("precondition failed: {0}")]
  PreconditionFailed(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error by the domain error behind it, if any.
  pub fn store<E: StoreError>(err: E) -> Self {
    let classified = err.domain().and_then(Self::from_domain);
    classified.unwrap_or_else(|| ApiError::Store(Box::new(err)))
  }

  fn from_domain(err: &DomainError) -> Option<Self> {
    match err {
      DomainError::Validation(errs) => Some(ApiError::Validation(errs.clone())),
      DomainError::NotFound(nf) => Some(ApiError::NotFound(nf.to_string())),
      DomainError::PreconditionFailed { .. } => {
        Some(ApiError::PreconditionFailed(err.to_string()))
      }
      DomainError::Serialization(_) => None,
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<DomainError> for ApiError {
  fn from(err: DomainError) -> Self {
    Self::from_domain(&err).unwrap_or_else(|| ApiError::Store(Box::new(err)))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let fields: &[FieldError] = match &self {
      ApiError::Validation(errs) => errs.fields(),
      _ => &[],
    };
    let body = json!({
      "success": false,
      "error": self.to_string(),
      "fields": fields,
    });
    (status, Json(body)).into_response()
  }
}
