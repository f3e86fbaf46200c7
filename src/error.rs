//! Application error type and its HTTP mapping.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Error)]
pub enum AppError {
  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Validation error: {0}")]
  Validation(String),

  #[error("AI service not configured")]
  AiUnavailable,

  #[error("AI service error: {0}")]
  Upstream(String),

  #[error("Could not read AI response: {0}")]
  Parse(String),
}

impl AppError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::AiUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Upstream(_) | AppError::Parse(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  pub code: u16,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    warn!(target: "quizcraft_backend", status = status.as_u16(), error = %self, "Request failed");
    (status, Json(ErrorResponse { error: self.to_string(), code: status.as_u16() })).into_response()
  }
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    AppError::Upstream(err.to_string())
  }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes() {
    assert_eq!(AppError::NotFound("quiz".into()).status_code(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::AiUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(AppError::Parse("x".into()).status_code(), StatusCode::BAD_GATEWAY);
  }

  #[test]
  fn messages() {
    assert_eq!(AppError::NotFound("quiz abc".into()).to_string(), "Not found: quiz abc");
    assert_eq!(AppError::AiUnavailable.to_string(), "AI service not configured");
  }
}
