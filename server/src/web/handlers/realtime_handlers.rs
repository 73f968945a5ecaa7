// server/src/web/handlers/realtime_handlers.rs

use actix_web::{web, HttpResponse};
use futures_util::stream;
use tracing::{info, instrument, warn};

use crate::errors::ApiError;
use crate::state::AppState;
use crate::web::extractors::Actor;

/// Per-user push stream over Server-Sent-Events.
///
/// The stream only ever carries already-durable notifications and ephemeral
/// location pings; a client that missed events simply polls
/// `GET /notifications`. Closing the connection drops the subscription and
/// the hub prunes the dead sender on its next push.
#[instrument(
  name = "handler::event_stream",
  skip(app_state, actor),
  fields(user_id = %actor.user_id)
)]
pub async fn event_stream_handler(app_state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse, ApiError> {
  info!("Subscribing user {} to their realtime room", actor.user_id);
  let receiver = app_state.hub.subscribe(actor.user_id);

  let sse_stream = stream::unfold(receiver, |mut receiver| async move {
    let push = receiver.recv().await?;
    let frame = match serde_json::to_string(&push) {
      Ok(json) => web::Bytes::from(format!("data: {}\n\n", json)),
      Err(serialize_err) => {
        warn!(error = %serialize_err, "Failed to serialize realtime push, sending keep-alive instead");
        web::Bytes::from_static(b":keep-alive\n\n")
      }
    };
    Some((Ok::<_, actix_web::Error>(frame), receiver))
  });

  Ok(
    HttpResponse::Ok()
      .content_type("text/event-stream")
      .insert_header(("Cache-Control", "no-cache"))
      .streaming(sse_stream),
  )
}
