// src/realtime.rs

//! Best-effort real-time push over per-user rooms.
//!
//! The channel only ever carries already-durable notifications and ephemeral
//! location pings; it is never the source of truth. A slow or disconnected
//! subscriber never delays the caller, and push failures are the caller's
//! to log and swallow.

use crate::error::DomainResult;
use crate::model::Notification;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

/// Payload pushed into a user's room.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RealtimePush {
  #[serde(rename_all = "camelCase")]
  Notification { notification: Notification },
  #[serde(rename_all = "camelCase")]
  DriverLocation {
    order_id: Uuid,
    driver_id: Uuid,
    latitude: f64,
    longitude: f64,
  },
}

/// A per-user addressable push channel.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
  /// Pushes to every subscriber of the user's room. Pushing to an empty
  /// room is a successful no-op.
  async fn push(&self, user_id: Uuid, payload: RealtimePush) -> DomainResult<()>;
}

/// In-process hub: one room per user id, fanned out over unbounded mpsc
/// senders. Subscribers that went away are pruned on the next push.
#[derive(Default)]
pub struct InProcessHub {
  rooms: RwLock<HashMap<Uuid, Vec<mpsc::UnboundedSender<RealtimePush>>>>,
}

impl InProcessHub {
  pub fn new() -> Self {
    Self::default()
  }

  /// Joins the user's room and returns the receiving half.
  pub fn subscribe(&self, user_id: Uuid) -> mpsc::UnboundedReceiver<RealtimePush> {
    let (tx, rx) = mpsc::unbounded_channel();
    self.rooms.write().entry(user_id).or_default().push(tx);
    rx
  }

  /// Number of live subscriptions for a user (post-prune view).
  pub fn room_size(&self, user_id: Uuid) -> usize {
    self
      .rooms
      .read()
      .get(&user_id)
      .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
      .unwrap_or(0)
  }
}

#[async_trait]
impl RealtimeChannel for InProcessHub {
  async fn push(&self, user_id: Uuid, payload: RealtimePush) -> DomainResult<()> {
    let mut rooms = self.rooms.write();
    if let Some(senders) = rooms.get_mut(&user_id) {
      senders.retain(|tx| tx.send(payload.clone()).is_ok());
      if senders.is_empty() {
        rooms.remove(&user_id);
      }
    } else {
      trace!(user_id = %user_id, "push to empty room dropped");
    }
    Ok(())
  }
}
