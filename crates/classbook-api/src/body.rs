//! JSON request bodies that fail in the API error envelope.
//!
//! `axum::Json` rejects malformed or mistyped bodies with a plain-text
//! response. [`JsonBody`] decodes in two passes, first to a
//! [`serde_json::Value`] and then to the typed input, and reports either
//! failure as a validation error on the `body` field.

use axum::{
  Json,
  extract::{FromRequest, Request},
};
use classbook_core::validate::ValidationErrors;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// A typed JSON request body.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let Json(value) = Json::<Value>::from_request(req, state)
      .await
      .map_err(|rejection| invalid(rejection.body_text()))?;
    serde_json::from_value(value)
      .map(JsonBody)
      .map_err(|e| invalid(e.to_string()))
  }
}

fn invalid(message: String) -> ApiError {
  ApiError::Validation(ValidationErrors::single("body", message))
}
