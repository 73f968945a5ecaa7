// src/model/driver.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Ephemeral last-known position of a driver, upserted on every ping.
///
/// A weak reference consulted by the assignment resolver to find available
/// drivers; never authoritative for order state.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocation {
  pub driver_id: Uuid,
  pub latitude: f64,
  pub longitude: f64,
  pub available: bool,
  pub updated_at: DateTime<Utc>,
}
