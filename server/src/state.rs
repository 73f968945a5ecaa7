// server/src/state.rs
use crate::config::AppConfig;
use pharmalink::{InProcessHub, NotificationDispatcher, OrderLifecycleService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub lifecycle: Arc<OrderLifecycleService>,
  pub dispatcher: Arc<NotificationDispatcher>,
  pub hub: Arc<InProcessHub>,
  pub config: Arc<AppConfig>,
}
