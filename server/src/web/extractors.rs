// server/src/web/extractors.rs

use actix_web::{FromRequest, HttpRequest};
use pharmalink::Role;
use tracing::warn;
use uuid::Uuid;

use crate::errors::ApiError;

/// The verified actor behind a request.
///
/// Authentication is an external collaborator: an upstream gateway verifies
/// the session and forwards the identity in `X-User-Id` / `X-User-Role`
/// headers. The engine still cross-checks the claimed role against the user
/// directory on every command.
#[derive(Debug)]
pub struct Actor {
  pub user_id: Uuid,
  pub role: Role,
}

impl FromRequest for Actor {
  type Error = ApiError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let header_str = |name: &str| {
      req
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
    };

    let parsed = header_str("X-User-Id")
      .and_then(|id| Uuid::parse_str(&id).ok())
      .zip(header_str("X-User-Role").and_then(|role| role.parse::<Role>().ok()));

    match parsed {
      Some((user_id, role)) => futures_util::future::ready(Ok(Actor { user_id, role })),
      None => {
        warn!("Actor extractor: missing or invalid X-User-Id / X-User-Role headers.");
        futures_util::future::ready(Err(ApiError::Auth(
          "User authentication required. Missing or invalid X-User-Id / X-User-Role headers.".to_string(),
        )))
      }
    }
  }
}
