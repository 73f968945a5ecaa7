// server/src/web/handlers/driver_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::ApiError;
use crate::state::AppState;
use crate::web::extractors::Actor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPingPayload {
  pub latitude: f64,
  pub longitude: f64,
  #[serde(default = "default_available")]
  pub available: bool,
}

fn default_available() -> bool {
  true
}

#[instrument(
  name = "handler::record_location",
  skip(app_state, req_payload, actor),
  fields(driver_id = %actor.user_id)
)]
pub async fn record_location_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LocationPingPayload>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  app_state
    .lifecycle
    .record_driver_location(
      actor.user_id,
      req_payload.latitude,
      req_payload.longitude,
      req_payload.available,
    )
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Location recorded." })))
}
