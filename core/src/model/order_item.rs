// src/model/order_item.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A line of an order. Snapshots the medicine name, unit price and
/// prescription flag at order time, so historic orders stay stable when the
/// live catalog changes. Created atomically with its order, immutable after.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub medicine_id: Uuid,
  pub medicine_name: String,
  pub unit_price: i64,
  pub quantity: i32,
  pub requires_prescription: bool,
  pub created_at: DateTime<Utc>,
}

impl OrderItem {
  pub fn line_total(&self) -> i64 {
    self.unit_price * i64::from(self.quantity)
  }
}
