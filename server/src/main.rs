// server/src/main.rs

// Declare modules for the application
mod config;
mod errors;
mod state;
mod web;

use crate::config::AppConfig;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use pharmalink::{
  DriverAssignmentResolver, InProcessHub, NotificationDispatcher, OrderLifecycleService, PgStore,
};
use pharmalink::{EventSink, NotificationStore, OrderStore, RealtimeChannel, UserDirectory};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // Initialize tracing subscriber for logging
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting pharmalink server...");

  // Load application configuration
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  // Initialize Database Pool
  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      panic!("Database connection error: {}", e);
    }
  };

  // One PgStore serves all three persistence contracts.
  let store = Arc::new(PgStore::new(db_pool));
  let orders: Arc<dyn OrderStore> = store.clone();
  let users: Arc<dyn UserDirectory> = store.clone();
  let notifications: Arc<dyn NotificationStore> = store;

  let hub = Arc::new(InProcessHub::new());
  let channel: Arc<dyn RealtimeChannel> = hub.clone();

  let resolver = DriverAssignmentResolver::new(users.clone());
  let dispatcher = Arc::new(NotificationDispatcher::new(
    notifications,
    users.clone(),
    resolver.clone(),
    channel,
  ));
  let events: Arc<dyn EventSink> = dispatcher.clone();
  let lifecycle = Arc::new(OrderLifecycleService::new(orders, users, resolver, events));

  let app_state = AppState {
    lifecycle,
    dispatcher,
    hub,
    config: app_config.clone(),
  };
  tracing::info!("Lifecycle engine wired.");

  // Configure and Start Actix Web Server
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::routes::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
