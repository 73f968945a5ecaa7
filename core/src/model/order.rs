// src/model/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of an order. Matches the `order_status_enum` Postgres
/// type in schema.sql. Wire values are snake_case (`in_transit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  Validated,
  Rejected,
  Paid,
  Preparing,
  Ready,
  InTransit,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  /// Every status, in lifecycle order (terminal side-exits last).
  pub const ALL: [OrderStatus; 9] = [
    OrderStatus::Pending,
    OrderStatus::Validated,
    OrderStatus::Paid,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::InTransit,
    OrderStatus::Delivered,
    OrderStatus::Rejected,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Validated => "validated",
      OrderStatus::Rejected => "rejected",
      OrderStatus::Paid => "paid",
      OrderStatus::Preparing => "preparing",
      OrderStatus::Ready => "ready",
      OrderStatus::InTransit => "in_transit",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  /// Terminal statuses admit no outgoing transition.
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      OrderStatus::Delivered | OrderStatus::Rejected | OrderStatus::Cancelled
    )
  }

  /// Position on the happy path, used to decide whether an explicit driver
  /// assignment may still force the order to `ready`. Terminal side-exits
  /// rank above everything so they are never "before" any status.
  pub fn rank(self) -> u8 {
    match self {
      OrderStatus::Pending => 0,
      OrderStatus::Validated => 1,
      OrderStatus::Paid => 2,
      OrderStatus::Preparing => 3,
      OrderStatus::Ready => 4,
      OrderStatus::InTransit => 5,
      OrderStatus::Delivered => 6,
      OrderStatus::Rejected | OrderStatus::Cancelled => 7,
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  CashOnDelivery,
  Card,
  MobileMoney,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
  Refunded,
}

/// Where the order is delivered. Stored as flat `delivery_*` columns on the
/// orders table; coordinates are optional (not every client geocodes).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
  #[sqlx(rename = "delivery_street")]
  pub street: String,
  #[sqlx(rename = "delivery_city")]
  pub city: String,
  #[sqlx(rename = "delivery_postal_code")]
  pub postal_code: String,
  #[sqlx(rename = "delivery_country")]
  pub country: String,
  #[sqlx(rename = "delivery_latitude")]
  pub latitude: Option<f64>,
  #[sqlx(rename = "delivery_longitude")]
  pub longitude: Option<f64>,
}

/// Root aggregate: one patient purchase from one pharmacy.
///
/// Mutated only through the transition authority; terminal orders are final
/// and are never hard-deleted. `total` and `delivery_fee` are plain currency
/// units (the marketplace currency has no minor unit).
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub patient_id: Uuid,
  pub pharmacy_id: Uuid,
  pub driver_id: Option<Uuid>,
  pub status: OrderStatus,
  pub total: i64,
  pub delivery_fee: i64,
  pub prescription_url: Option<String>,
  pub rejection_reason: Option<String>,
  #[sqlx(flatten)]
  pub delivery_address: DeliveryAddress,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub estimated_delivery: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
