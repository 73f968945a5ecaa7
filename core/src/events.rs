// src/events.rs

//! Domain events emitted by the lifecycle service strictly after a store
//! commit. Consumers (the notification dispatcher) own all delivery-channel
//! concerns; event handling can never undo a committed state change.

use crate::model::{Order, OrderStatus, Role, User};
use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum OrderEvent {
  /// A new order was committed together with its items and first audit row.
  Created { order: Order },

  /// A transition was committed; `order` carries the post-commit state.
  Transitioned {
    order: Order,
    previous: OrderStatus,
    actor_id: Uuid,
    actor_role: Role,
  },

  /// A driver was explicitly attached by the pharmacy or an admin.
  DriverAssigned {
    order: Order,
    driver: User,
    assigned_by: Uuid,
  },

  /// The patient replaced the prescription reference on a pending order.
  PrescriptionUpdated { order: Order },

  /// A driver pinged their position; `moving_orders` are that driver's
  /// in-transit deliveries whose patients get a location push.
  DriverPinged {
    driver_id: Uuid,
    latitude: f64,
    longitude: f64,
    moving_orders: Vec<Order>,
  },
}

/// Post-commit event consumer. `publish` is infallible by contract: an
/// implementation absorbs and logs its own failures, because the triggering
/// command has already committed and must report success.
#[async_trait]
pub trait EventSink: Send + Sync {
  async fn publish(&self, event: OrderEvent);
}

/// Sink that drops every event; useful for wiring the lifecycle service in
/// contexts where fan-out is not wanted.
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
  async fn publish(&self, _event: OrderEvent) {}
}
