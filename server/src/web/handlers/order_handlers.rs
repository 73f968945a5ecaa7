// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::state::AppState;
use crate::web::extractors::Actor;
use pharmalink::{CreateOrderRequest, TransitionRequest};

#[instrument(
  name = "handler::create_order",
  skip(app_state, req_payload, actor),
  fields(patient_id = %actor.user_id)
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateOrderRequest>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  let (order, items) = app_state
    .lifecycle
    .create_order(actor.user_id, req_payload.into_inner())
    .await?;

  info!(order_id = %order.id, total = order.total, "order created");
  Ok(HttpResponse::Created().json(json!({
    "orderId": order.id,
    "total": order.total,
    "status": order.status,
    "items": items,
  })))
}

#[instrument(
  name = "handler::list_orders",
  skip(app_state, actor),
  fields(actor_id = %actor.user_id, role = %actor.role)
)]
pub async fn list_orders_handler(app_state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse, ApiError> {
  let orders = app_state.lifecycle.list_orders(actor.user_id, actor.role).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(
  name = "handler::get_order",
  skip(app_state, actor, path),
  fields(actor_id = %actor.user_id)
)]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  let detail = app_state
    .lifecycle
    .get_order(path.into_inner(), actor.user_id, actor.role)
    .await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(
  name = "handler::submit_transition",
  skip(app_state, req_payload, actor, path),
  fields(actor_id = %actor.user_id, role = %actor.role, target = %req_payload.status)
)]
pub async fn submit_transition_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<TransitionRequest>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  let order = app_state
    .lifecycle
    .submit_transition(actor.user_id, actor.role, path.into_inner(), req_payload.into_inner())
    .await?;

  Ok(HttpResponse::Ok().json(json!({
    "message": "Order status updated.",
    "order": order,
  })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrescriptionPayload {
  pub prescription_url: String,
}

#[instrument(
  name = "handler::update_prescription",
  skip(app_state, req_payload, actor, path),
  fields(patient_id = %actor.user_id)
)]
pub async fn update_prescription_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdatePrescriptionPayload>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  let order = app_state
    .lifecycle
    .update_prescription(path.into_inner(), actor.user_id, &req_payload.prescription_url)
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Prescription updated.",
    "order": order,
  })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDriverPayload {
  pub driver_id: Uuid,
}

#[instrument(
  name = "handler::assign_driver",
  skip(app_state, req_payload, actor, path),
  fields(requester_id = %actor.user_id, driver_id = %req_payload.driver_id)
)]
pub async fn assign_driver_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<AssignDriverPayload>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  let order = app_state
    .lifecycle
    .assign_driver(path.into_inner(), actor.user_id, req_payload.driver_id)
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Driver assigned.",
    "order": order,
  })))
}

#[instrument(
  name = "handler::tracking_history",
  skip(app_state, actor, path),
  fields(actor_id = %actor.user_id)
)]
pub async fn tracking_history_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  let tracking = app_state
    .lifecycle
    .tracking_history(path.into_inner(), actor.user_id, actor.role)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "tracking": tracking })))
}
