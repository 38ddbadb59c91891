//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use boxoffice_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  PaymentRequired(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  fn classify(kind: ErrorKind, e: impl std::error::Error + Send + Sync + 'static) -> Self {
    match kind {
      ErrorKind::NotFound => Self::NotFound(e.to_string()),
      ErrorKind::Conflict => Self::Conflict(e.to_string()),
      ErrorKind::PaymentRequired => Self::PaymentRequired(e.to_string()),
      ErrorKind::Validation => Self::BadRequest(e.to_string()),
      ErrorKind::Infrastructure => Self::Internal(Box::new(e)),
    }
  }

  /// Convert any store error via the core taxonomy.
  pub fn from_store<E: Into<boxoffice_core::Error>>(e: E) -> Self {
    let core: boxoffice_core::Error = e.into();
    core.into()
  }
}

impl From<boxoffice_core::Error> for ApiError {
  fn from(e: boxoffice_core::Error) -> Self { Self::classify(e.kind(), e) }
}

impl From<boxoffice_payments::Error> for ApiError {
  fn from(e: boxoffice_payments::Error) -> Self {
    match e {
      boxoffice_payments::Error::Core(inner) => inner.into(),
      other => Self::classify(other.kind(), other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::PaymentRequired(m) => (StatusCode::PAYMENT_REQUIRED, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
