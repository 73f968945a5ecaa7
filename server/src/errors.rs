// server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use pharmalink::DomainError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Domain(#[from] DomainError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for ApiError {
  fn from(err: anyhow::Error) -> Self {
    ApiError::Internal(err.to_string())
  }
}

impl ResponseError for ApiError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(api_error = %self, "Responding with error");
    match self {
      ApiError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      ApiError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      // Each taxonomy kind maps to a distinct, machine-distinguishable
      // status so clients can tell "fix input" from "refresh and re-decide".
      ApiError::Domain(domain_err) => match domain_err {
        DomainError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m, "kind": "validation"})),
        DomainError::AccessDenied(m) => HttpResponse::Forbidden().json(json!({"error": m, "kind": "access_denied"})),
        DomainError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m, "kind": "not_found"})),
        DomainError::InvalidTransition { .. } => {
          HttpResponse::Conflict().json(json!({"error": domain_err.to_string(), "kind": "invalid_transition"}))
        }
        DomainError::Conflict(m) => HttpResponse::Conflict().json(json!({"error": m, "kind": "conflict"})),
        DomainError::InsufficientStock { .. } => {
          HttpResponse::Conflict().json(json!({"error": domain_err.to_string(), "kind": "insufficient_stock"}))
        }
        DomainError::Sqlx(_) | DomainError::Internal(_) => {
          HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred"}))
        }
      },
      ApiError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = ApiError> = std::result::Result<T, E>;
