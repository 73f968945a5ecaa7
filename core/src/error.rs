// src/error.rs
use crate::model::OrderStatus;
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// The caller-facing error taxonomy of the lifecycle engine.
///
/// Every command returns one of these kinds so that callers can distinguish
/// "fix your input and retry" (`Validation`) from "refresh and re-decide"
/// (`Conflict` / `InvalidTransition`) from "you may not do this at all"
/// (`AccessDenied`). Notification and push failures are never represented
/// here; they are absorbed by the dispatcher.
#[derive(Debug, Error)]
pub enum DomainError {
  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Access denied: {0}")]
  AccessDenied(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Invalid transition from '{from}' to '{to}'")]
  InvalidTransition { from: OrderStatus, to: OrderStatus },

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Insufficient stock for '{medicine}': requested {requested}, available {available}")]
  InsufficientStock {
    medicine: String,
    requested: i32,
    available: i32,
  },

  #[error("Database error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal error: {0}")]
  Internal(#[source] AnyhowError),
}

// External opaque errors (channel implementations, etc.) collapse into
// `Internal` unless they already carry a DomainError.
impl From<AnyhowError> for DomainError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<DomainError>() {
      Ok(domain_err) => domain_err,
      Err(other) => DomainError::Internal(other),
    }
  }
}

pub type DomainResult<T, E = DomainError> = std::result::Result<T, E>;
