// src/model/medicine.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Live catalog row, read at order-creation time for the stock check and the
/// per-item snapshot. Catalog CRUD itself is an external collaborator.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
  pub id: Uuid,
  pub pharmacy_id: Uuid,
  pub name: String,
  pub price: i64,
  pub quantity: i32,
  pub requires_prescription: bool,
  pub created_at: DateTime<Utc>,
}
