// src/model/tracking.rs

use crate::model::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A geographic coordinate supplied by a client (driver app, geocoder).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
  pub latitude: f64,
  pub longitude: f64,
}

/// Append-only audit row: one per committed transition, never updated or
/// deleted. Ordered by `created_at`, the last row's status always equals the
/// order's current status.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrackingUpdate {
  pub id: Uuid,
  pub order_id: Uuid,
  pub status: OrderStatus,
  pub message: String,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
  pub created_at: DateTime<Utc>,
}
