// src/model/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// Severity/intent of a notification, mirrored by the client as toast style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "notification_type_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
  Info,
  Success,
  Warning,
  Error,
}

/// Durable per-recipient notification record.
///
/// This row, not the real-time push, is the source of truth for "did the
/// user get informed": the push channel is purely a latency optimization.
/// Mutated only to flip `is_read`; deletable by its owner.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: Uuid,
  pub user_id: Uuid,
  pub title: String,
  pub message: String,
  #[serde(rename = "type")]
  pub kind: NotificationKind,
  pub is_read: bool,
  pub order_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}
