// src/lifecycle.rs

//! The order lifecycle service: load order, consult the transition
//! authority, write atomically through the store, then emit a domain event.
//!
//! Ordering is the whole point: permission and validation failures abort
//! before any write; persistence failures roll back entirely inside the
//! store; event emission happens strictly after the commit and is absorbed
//! by the sink, so notification trouble can never undo a committed state.

use crate::assignment::DriverAssignmentResolver;
use crate::error::{DomainError, DomainResult};
use crate::events::{EventSink, OrderEvent};
use crate::model::{
  DeliveryAddress, DriverLocation, GeoPoint, Order, OrderItem, OrderStatus, PaymentMethod, Role, TrackingUpdate, User,
};
use crate::store::{CreateOrder, NewOrderLine, OrderScope, OrderStore, TransitionWrite, UserDirectory};
use crate::transition::{self, TransitionPayload};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Client command to create an order. The actor id (the patient) travels
/// separately, already verified by the auth collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
  pub pharmacy_id: Uuid,
  pub items: Vec<OrderLineRequest>,
  pub delivery_address: DeliveryAddress,
  pub prescription_url: Option<String>,
  pub payment_method: PaymentMethod,
  #[serde(default)]
  pub delivery_fee: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
  pub medicine_id: Uuid,
  pub quantity: i32,
}

/// Client command to move an order to a new status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
  pub status: OrderStatus,
  pub rejection_reason: Option<String>,
  pub driver_id: Option<Uuid>,
  pub location: Option<GeoPoint>,
}

/// Read model for one order: the aggregate plus its immutable items and the
/// ordered audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
  pub order: Order,
  pub items: Vec<OrderItem>,
  pub tracking: Vec<TrackingUpdate>,
}

pub struct OrderLifecycleService {
  orders: Arc<dyn OrderStore>,
  users: Arc<dyn UserDirectory>,
  resolver: DriverAssignmentResolver,
  events: Arc<dyn EventSink>,
}

impl OrderLifecycleService {
  pub fn new(
    orders: Arc<dyn OrderStore>,
    users: Arc<dyn UserDirectory>,
    resolver: DriverAssignmentResolver,
    events: Arc<dyn EventSink>,
  ) -> Self {
    Self {
      orders,
      users,
      resolver,
      events,
    }
  }

  async fn require_user(&self, user_id: Uuid) -> DomainResult<User> {
    self
      .users
      .find_user(user_id)
      .await?
      .ok_or_else(|| DomainError::NotFound(format!("user {} not found", user_id)))
  }

  /// Same lookup, but also cross-checks the role the auth layer claims.
  async fn require_actor(&self, actor_id: Uuid, claimed_role: Role) -> DomainResult<User> {
    let actor = self.require_user(actor_id).await?;
    if actor.role != claimed_role {
      return Err(DomainError::AccessDenied(format!(
        "actor {} is not a '{}'",
        actor_id, claimed_role
      )));
    }
    Ok(actor)
  }

  /// Creates the order atomically with its items and first audit row.
  #[instrument(skip(self, req), fields(patient_id = %patient_id, pharmacy_id = %req.pharmacy_id))]
  pub async fn create_order(&self, patient_id: Uuid, req: CreateOrderRequest) -> DomainResult<(Order, Vec<OrderItem>)> {
    let patient = self.require_user(patient_id).await?;
    if patient.role != Role::Patient {
      return Err(DomainError::AccessDenied("only patients may place orders".to_string()));
    }
    if req.items.is_empty() {
      return Err(DomainError::Validation("an order needs at least one item".to_string()));
    }
    if req.items.iter().any(|line| line.quantity <= 0) {
      return Err(DomainError::Validation("item quantities must be positive".to_string()));
    }
    if req.delivery_fee < 0 {
      return Err(DomainError::Validation("delivery fee cannot be negative".to_string()));
    }

    let (order, items) = self
      .orders
      .create_order(CreateOrder {
        patient_id,
        pharmacy_id: req.pharmacy_id,
        items: req
          .items
          .iter()
          .map(|line| NewOrderLine {
            medicine_id: line.medicine_id,
            quantity: line.quantity,
          })
          .collect(),
        delivery_address: req.delivery_address,
        prescription_url: req.prescription_url,
        payment_method: req.payment_method,
        delivery_fee: req.delivery_fee,
        audit_message: transition::CREATED_MESSAGE.to_string(),
      })
      .await?;

    info!(order_id = %order.id, total = order.total, "order created");
    self.events.publish(OrderEvent::Created { order: order.clone() }).await;
    Ok((order, items))
  }

  /// Applies one role-and-state-gated transition.
  #[instrument(skip(self, req), fields(order_id = %order_id, actor_id = %actor_id, target = %req.status))]
  pub async fn submit_transition(
    &self,
    actor_id: Uuid,
    actor_role: Role,
    order_id: Uuid,
    req: TransitionRequest,
  ) -> DomainResult<Order> {
    let actor = self.require_actor(actor_id, actor_role).await?;
    let order = self.orders.load_order(order_id).await?;
    let previous = order.status;

    let payload = TransitionPayload {
      rejection_reason: req.rejection_reason,
      driver_id: req.driver_id,
      location: req.location,
    };
    let decision = transition::authorize(&actor, &order, req.status, &payload)?;

    let mut write = TransitionWrite {
      new_status: req.status,
      expected_status: previous,
      require_unassigned: decision.claim_driver.is_some(),
      set_driver: decision.claim_driver,
      rejection_reason: decision.rejection_reason,
      stamp_delivered: req.status == OrderStatus::Delivered,
      audit_message: decision.message,
      location: payload.location,
    };

    // Explicit driver attachment while marking the order ready happens in
    // the same atomic write as the status change.
    let mut assigned_driver = None;
    if req.status == OrderStatus::Ready {
      if let Some(driver_id) = payload.driver_id {
        let driver = self.resolver.validate_driver(driver_id).await?;
        write.set_driver = Some(driver.id);
        write.audit_message.push_str(&format!(" - Livreur: {}", driver.name));
        assigned_driver = Some(driver);
      }
    }

    let updated = self.orders.apply_transition(order_id, write).await?;
    info!(order_id = %order_id, from = %previous, to = %updated.status, "transition committed");

    self
      .events
      .publish(OrderEvent::Transitioned {
        order: updated.clone(),
        previous,
        actor_id,
        actor_role,
      })
      .await;
    if let Some(driver) = assigned_driver {
      self
        .events
        .publish(OrderEvent::DriverAssigned {
          order: updated.clone(),
          driver,
          assigned_by: actor_id,
        })
        .await;
    }

    Ok(updated)
  }

  /// Explicitly attaches a driver (pharmacy owner or admin only). Forces the
  /// status forward to `ready` when the order has not reached it yet; never
  /// regresses a further-advanced order.
  #[instrument(skip(self), fields(order_id = %order_id, requester_id = %requester_id, driver_id = %driver_id))]
  pub async fn assign_driver(&self, order_id: Uuid, requester_id: Uuid, driver_id: Uuid) -> DomainResult<Order> {
    let requester = self.require_user(requester_id).await?;
    let order = self.orders.load_order(order_id).await?;

    let allowed = match requester.role {
      Role::Admin => true,
      Role::Pharmacist => requester.pharmacy_id == Some(order.pharmacy_id),
      Role::Patient | Role::Driver => false,
    };
    if !allowed {
      return Err(DomainError::AccessDenied(
        "only the pharmacy owner or an admin may assign a driver".to_string(),
      ));
    }
    if order.status.is_terminal() {
      return Err(DomainError::Conflict(format!(
        "order {} is in terminal state '{}'",
        order.id, order.status
      )));
    }

    let driver = self.resolver.validate_driver(driver_id).await?;

    let new_status = if order.status.rank() < OrderStatus::Ready.rank() {
      OrderStatus::Ready
    } else {
      order.status
    };

    let updated = self
      .orders
      .apply_transition(
        order_id,
        TransitionWrite {
          new_status,
          expected_status: order.status,
          require_unassigned: false,
          set_driver: Some(driver.id),
          rejection_reason: None,
          stamp_delivered: false,
          audit_message: format!("Livreur assigné: {}", driver.name),
          location: None,
        },
      )
      .await?;
    info!(order_id = %order_id, driver_id = %driver.id, "driver assigned");

    self
      .events
      .publish(OrderEvent::DriverAssigned {
        order: updated.clone(),
        driver,
        assigned_by: requester_id,
      })
      .await;

    Ok(updated)
  }

  /// Replaces the prescription reference on the patient's own pending order.
  #[instrument(skip(self, prescription_url), fields(order_id = %order_id, patient_id = %patient_id))]
  pub async fn update_prescription(
    &self,
    order_id: Uuid,
    patient_id: Uuid,
    prescription_url: &str,
  ) -> DomainResult<Order> {
    if prescription_url.trim().is_empty() {
      return Err(DomainError::Validation("prescription reference cannot be empty".to_string()));
    }
    let order = self.orders.load_order(order_id).await?;
    if order.patient_id != patient_id {
      return Err(DomainError::AccessDenied(
        "only the order's patient may update the prescription".to_string(),
      ));
    }

    let updated = self.orders.update_prescription(order_id, prescription_url).await?;
    self
      .events
      .publish(OrderEvent::PrescriptionUpdated { order: updated.clone() })
      .await;
    Ok(updated)
  }

  /// Role-filtered listing: patients see their own orders, pharmacists their
  /// pharmacy's, drivers their assignments plus unassigned ready orders,
  /// admins everything.
  pub async fn list_orders(&self, actor_id: Uuid, actor_role: Role) -> DomainResult<Vec<Order>> {
    let actor = self.require_actor(actor_id, actor_role).await?;
    let scope = match actor.role {
      Role::Patient => OrderScope::Patient(actor.id),
      Role::Pharmacist => {
        let pharmacy_id = actor.pharmacy_id.ok_or_else(|| {
          DomainError::AccessDenied("pharmacist account is not linked to a pharmacy".to_string())
        })?;
        OrderScope::Pharmacy(pharmacy_id)
      }
      Role::Driver => OrderScope::Driver(actor.id),
      Role::Admin => OrderScope::All,
    };
    self.orders.list_orders(scope).await
  }

  /// Full read model for one order, gated by the same visibility rules as
  /// [`Self::list_orders`].
  pub async fn get_order(&self, order_id: Uuid, actor_id: Uuid, actor_role: Role) -> DomainResult<OrderDetail> {
    let actor = self.require_actor(actor_id, actor_role).await?;
    let order = self.orders.load_order(order_id).await?;

    let visible = match actor.role {
      Role::Admin => true,
      Role::Patient => order.patient_id == actor.id,
      Role::Pharmacist => actor.pharmacy_id == Some(order.pharmacy_id),
      Role::Driver => {
        order.driver_id == Some(actor.id) || (order.status == OrderStatus::Ready && order.driver_id.is_none())
      }
    };
    if !visible {
      return Err(DomainError::AccessDenied("this order is not visible to you".to_string()));
    }

    let items = self.orders.order_items(order_id).await?;
    let tracking = self.orders.tracking_history(order_id).await?;
    Ok(OrderDetail { order, items, tracking })
  }

  /// Ordered audit trail for one order (same gate as [`Self::get_order`]).
  pub async fn tracking_history(
    &self,
    order_id: Uuid,
    actor_id: Uuid,
    actor_role: Role,
  ) -> DomainResult<Vec<TrackingUpdate>> {
    Ok(self.get_order(order_id, actor_id, actor_role).await?.tracking)
  }

  /// Idempotent driver location ping: upserts the last-known position and
  /// emits a best-effort location event for the driver's moving deliveries.
  #[instrument(skip(self), fields(driver_id = %driver_id))]
  pub async fn record_driver_location(
    &self,
    driver_id: Uuid,
    latitude: f64,
    longitude: f64,
    available: bool,
  ) -> DomainResult<()> {
    let driver = self.require_actor(driver_id, Role::Driver).await?;

    self
      .users
      .upsert_driver_location(DriverLocation {
        driver_id: driver.id,
        latitude,
        longitude,
        available,
        updated_at: Utc::now(),
      })
      .await?;

    let moving_orders = self.orders.orders_in_transit_for_driver(driver.id).await?;
    self
      .events
      .publish(OrderEvent::DriverPinged {
        driver_id: driver.id,
        latitude,
        longitude,
        moving_orders,
      })
      .await;
    Ok(())
  }
}
