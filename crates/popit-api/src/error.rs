//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use popit_core::{Error as CoreError, store::StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Conflict(String),

  /// `If-Match` named a representation that is no longer current.
  #[error("precondition failed")]
  PreconditionFailed,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store failure. Core errors the client caused keep their own
  /// status; anything else is a 500.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    if let Some(api) = err.as_core().and_then(Self::classify) {
      return api;
    }
    Self::Store(Box::new(err))
  }

  fn classify(err: &CoreError) -> Option<Self> {
    let message = err.to_string();
    match err {
      CoreError::FieldNotExist { .. }
      | CoreError::MissingField { .. }
      | CoreError::InvalidLanguage(_)
      | CoreError::InvalidId(_)
      | CoreError::UnknownEntityKind(_)
      | CoreError::OwnerRequired(_)
      | CoreError::UnexpectedOwner(_) => Some(Self::BadRequest(message)),
      CoreError::OwnerNotPersisted(_) | CoreError::OwnerChanged(_) => {
        Some(Self::Conflict(message))
      }
      CoreError::OwnerNotFound(_)
      | CoreError::EntityNotFound { .. }
      | CoreError::TranslationMissing { .. } => Some(Self::NotFound(message)),
      _ => None,
    }
  }
}

impl From<CoreError> for ApiError {
  fn from(err: CoreError) -> Self {
    if let Some(api) = Self::classify(&err) {
      return api;
    }
    Self::Store(Box::new(err))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::PreconditionFailed => {
        (StatusCode::PRECONDITION_FAILED, self.to_string())
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
