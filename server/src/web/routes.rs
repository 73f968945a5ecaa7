// server/src/web/routes.rs

use actix_web::web;

// Simple health check; deployment probes hit this.
async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Called in `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  use crate::web::handlers::{driver_handlers, notification_handlers, order_handlers, realtime_handlers};

  cfg.service(
    web::scope("/api/v1")
      // Health Check Route
      .route("/health", web::get().to(health_check_handler))
      // Order Routes
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route(
            "/{order_id}/status",
            web::patch().to(order_handlers::submit_transition_handler),
          )
          .route(
            "/{order_id}/prescription",
            web::put().to(order_handlers::update_prescription_handler),
          )
          .route("/{order_id}/assign", web::post().to(order_handlers::assign_driver_handler))
          .route(
            "/{order_id}/tracking",
            web::get().to(order_handlers::tracking_history_handler),
          ),
      )
      // Notification Routes
      .service(
        web::scope("/notifications")
          .route("", web::get().to(notification_handlers::list_notifications_handler))
          .route(
            "/read-all",
            web::patch().to(notification_handlers::mark_all_read_handler),
          )
          .route(
            "/{notification_id}/read",
            web::patch().to(notification_handlers::mark_read_handler),
          )
          .route(
            "/{notification_id}",
            web::delete().to(notification_handlers::delete_notification_handler),
          ),
      )
      // Driver Routes
      .service(web::scope("/drivers").route("/location", web::post().to(driver_handlers::record_location_handler)))
      // Real-time push: per-user Server-Sent-Events stream
      .route("/events", web::get().to(realtime_handlers::event_stream_handler)),
  );
}
