// server/src/web/handlers/notification_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::state::AppState;
use crate::web::extractors::Actor;

#[instrument(
  name = "handler::list_notifications",
  skip(app_state, actor),
  fields(user_id = %actor.user_id)
)]
pub async fn list_notifications_handler(
  app_state: web::Data<AppState>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  let notifications = app_state.dispatcher.notifications_for_user(actor.user_id).await?;
  let unread = notifications.iter().filter(|n| !n.is_read).count();
  Ok(HttpResponse::Ok().json(json!({
    "notifications": notifications,
    "unreadCount": unread,
  })))
}

#[instrument(
  name = "handler::mark_notification_read",
  skip(app_state, actor, path),
  fields(user_id = %actor.user_id)
)]
pub async fn mark_read_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  let notification = app_state.dispatcher.mark_read(path.into_inner(), actor.user_id).await?;
  Ok(HttpResponse::Ok().json(notification))
}

#[instrument(
  name = "handler::mark_all_notifications_read",
  skip(app_state, actor),
  fields(user_id = %actor.user_id)
)]
pub async fn mark_all_read_handler(app_state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse, ApiError> {
  let updated = app_state.dispatcher.mark_all_read(actor.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}

#[instrument(
  name = "handler::delete_notification",
  skip(app_state, actor, path),
  fields(user_id = %actor.user_id)
)]
pub async fn delete_notification_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  actor: Actor,
) -> Result<HttpResponse, ApiError> {
  app_state.dispatcher.delete(path.into_inner(), actor.user_id).await?;
  Ok(HttpResponse::NoContent().finish())
}
