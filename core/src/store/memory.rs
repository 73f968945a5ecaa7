// src/store/memory.rs

//! In-memory store with the same compare-and-set semantics as the Postgres
//! implementation. Used by the test suite and for running the engine without
//! a database; a single mutex stands in for the row-level serialization the
//! relational store provides.

use crate::error::{DomainError, DomainResult};
use crate::model::{DriverLocation, Medicine, Notification, Order, OrderItem, TrackingUpdate, User};
use crate::model::{OrderStatus, PaymentStatus};
use crate::store::{CreateOrder, NotificationStore, OrderScope, OrderStore, TransitionWrite, UserDirectory};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
  users: HashMap<Uuid, User>,
  medicines: HashMap<Uuid, Medicine>,
  orders: HashMap<Uuid, Order>,
  items: HashMap<Uuid, Vec<OrderItem>>,
  tracking: HashMap<Uuid, Vec<TrackingUpdate>>,
  notifications: HashMap<Uuid, Notification>,
  locations: HashMap<Uuid, DriverLocation>,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  // Seeding helpers; the catalog and user CRUD are external collaborators,
  // so they never appear on the store traits.

  pub fn insert_user(&self, user: User) {
    self.inner.lock().users.insert(user.id, user);
  }

  pub fn insert_medicine(&self, medicine: Medicine) {
    self.inner.lock().medicines.insert(medicine.id, medicine);
  }

  pub fn medicine_stock(&self, medicine_id: Uuid) -> Option<i32> {
    self.inner.lock().medicines.get(&medicine_id).map(|m| m.quantity)
  }

  pub fn order_count(&self) -> usize {
    self.inner.lock().orders.len()
  }

  pub fn item_row_count(&self) -> usize {
    self.inner.lock().items.values().map(Vec::len).sum()
  }

  pub fn tracking_row_count(&self) -> usize {
    self.inner.lock().tracking.values().map(Vec::len).sum()
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn create_order(&self, req: CreateOrder) -> DomainResult<(Order, Vec<OrderItem>)> {
    let mut inner = self.inner.lock();
    let now = Utc::now();
    let order_id = Uuid::new_v4();

    // Validate every line before mutating anything, so a failing line leaves
    // no partial order, item or stock change behind. Remaining stock is
    // tracked across lines, so duplicate lines for one medicine cannot
    // oversell.
    let mut remaining: HashMap<Uuid, i32> = HashMap::new();
    let mut snapshots: Vec<(Medicine, i32)> = Vec::with_capacity(req.items.len());
    for line in &req.items {
      let medicine = inner
        .medicines
        .get(&line.medicine_id)
        .cloned()
        .ok_or_else(|| DomainError::NotFound(format!("medicine {} not found", line.medicine_id)))?;
      if medicine.pharmacy_id != req.pharmacy_id {
        return Err(DomainError::Validation(format!(
          "medicine '{}' is not sold by this pharmacy",
          medicine.name
        )));
      }
      let available = *remaining.entry(medicine.id).or_insert(medicine.quantity);
      if available < line.quantity {
        return Err(DomainError::InsufficientStock {
          medicine: medicine.name,
          requested: line.quantity,
          available,
        });
      }
      remaining.insert(medicine.id, available - line.quantity);
      snapshots.push((medicine, line.quantity));
    }

    for (medicine, quantity) in &snapshots {
      if let Some(live) = inner.medicines.get_mut(&medicine.id) {
        live.quantity -= quantity;
      }
    }

    let total: i64 = snapshots
      .iter()
      .map(|(medicine, quantity)| medicine.price * i64::from(*quantity))
      .sum();

    let order = Order {
      id: order_id,
      patient_id: req.patient_id,
      pharmacy_id: req.pharmacy_id,
      driver_id: None,
      status: OrderStatus::Pending,
      total,
      delivery_fee: req.delivery_fee,
      prescription_url: req.prescription_url.clone(),
      rejection_reason: None,
      delivery_address: req.delivery_address.clone(),
      payment_method: req.payment_method,
      payment_status: PaymentStatus::Pending,
      estimated_delivery: None,
      delivered_at: None,
      created_at: now,
      updated_at: now,
    };

    let items: Vec<OrderItem> = snapshots
      .into_iter()
      .map(|(medicine, quantity)| OrderItem {
        id: Uuid::new_v4(),
        order_id,
        medicine_id: medicine.id,
        medicine_name: medicine.name,
        unit_price: medicine.price,
        quantity,
        requires_prescription: medicine.requires_prescription,
        created_at: now,
      })
      .collect();

    inner.orders.insert(order_id, order.clone());
    inner.items.insert(order_id, items.clone());
    inner.tracking.insert(
      order_id,
      vec![TrackingUpdate {
        id: Uuid::new_v4(),
        order_id,
        status: OrderStatus::Pending,
        message: req.audit_message,
        latitude: None,
        longitude: None,
        created_at: now,
      }],
    );

    Ok((order, items))
  }

  async fn load_order(&self, order_id: Uuid) -> DomainResult<Order> {
    self
      .inner
      .lock()
      .orders
      .get(&order_id)
      .cloned()
      .ok_or_else(|| DomainError::NotFound(format!("order {} not found", order_id)))
  }

  async fn list_orders(&self, scope: OrderScope) -> DomainResult<Vec<Order>> {
    let inner = self.inner.lock();
    let mut orders: Vec<Order> = inner
      .orders
      .values()
      .filter(|order| match scope {
        OrderScope::Patient(patient_id) => order.patient_id == patient_id,
        OrderScope::Pharmacy(pharmacy_id) => order.pharmacy_id == pharmacy_id,
        OrderScope::Driver(driver_id) => {
          order.driver_id == Some(driver_id) || (order.status == OrderStatus::Ready && order.driver_id.is_none())
        }
        OrderScope::All => true,
      })
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn order_items(&self, order_id: Uuid) -> DomainResult<Vec<OrderItem>> {
    Ok(self.inner.lock().items.get(&order_id).cloned().unwrap_or_default())
  }

  async fn tracking_history(&self, order_id: Uuid) -> DomainResult<Vec<TrackingUpdate>> {
    Ok(self.inner.lock().tracking.get(&order_id).cloned().unwrap_or_default())
  }

  async fn apply_transition(&self, order_id: Uuid, write: TransitionWrite) -> DomainResult<Order> {
    let mut inner = self.inner.lock();
    let now = Utc::now();

    let order = inner
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| DomainError::NotFound(format!("order {} not found", order_id)))?;

    // Same gate as the SQL conditional update: of two racing transitions at
    // most one sees the expected row state.
    if order.status != write.expected_status || (write.require_unassigned && order.driver_id.is_some()) {
      return Err(DomainError::Conflict(format!(
        "order {} changed concurrently (expected status '{}')",
        order_id, write.expected_status
      )));
    }

    order.status = write.new_status;
    if let Some(reason) = &write.rejection_reason {
      order.rejection_reason = Some(reason.clone());
    }
    if let Some(driver_id) = write.set_driver {
      order.driver_id = Some(driver_id);
    }
    if write.stamp_delivered && order.delivered_at.is_none() {
      order.delivered_at = Some(now);
    }
    order.updated_at = now;
    let updated = order.clone();

    inner.tracking.entry(order_id).or_default().push(TrackingUpdate {
      id: Uuid::new_v4(),
      order_id,
      status: write.new_status,
      message: write.audit_message,
      latitude: write.location.map(|p| p.latitude),
      longitude: write.location.map(|p| p.longitude),
      created_at: now,
    });

    Ok(updated)
  }

  async fn update_prescription(&self, order_id: Uuid, prescription_url: &str) -> DomainResult<Order> {
    let mut inner = self.inner.lock();
    let order = inner
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| DomainError::NotFound(format!("order {} not found", order_id)))?;
    if order.status != OrderStatus::Pending {
      return Err(DomainError::Conflict(
        "prescription can only be updated while the order is pending".to_string(),
      ));
    }
    order.prescription_url = Some(prescription_url.to_string());
    order.updated_at = Utc::now();
    Ok(order.clone())
  }

  async fn orders_in_transit_for_driver(&self, driver_id: Uuid) -> DomainResult<Vec<Order>> {
    let inner = self.inner.lock();
    Ok(
      inner
        .orders
        .values()
        .filter(|order| order.driver_id == Some(driver_id) && order.status == OrderStatus::InTransit)
        .cloned()
        .collect(),
    )
  }
}

#[async_trait]
impl NotificationStore for MemoryStore {
  async fn insert_notification(&self, notification: Notification) -> DomainResult<Notification> {
    self
      .inner
      .lock()
      .notifications
      .insert(notification.id, notification.clone());
    Ok(notification)
  }

  async fn notifications_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Notification>> {
    let inner = self.inner.lock();
    let mut rows: Vec<Notification> = inner
      .notifications
      .values()
      .filter(|n| n.user_id == user_id)
      .cloned()
      .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(rows)
  }

  async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> DomainResult<Notification> {
    let mut inner = self.inner.lock();
    match inner.notifications.get_mut(&notification_id) {
      Some(notification) if notification.user_id == user_id => {
        notification.is_read = true;
        Ok(notification.clone())
      }
      _ => Err(DomainError::NotFound(format!(
        "notification {} not found",
        notification_id
      ))),
    }
  }

  async fn mark_all_notifications_read(&self, user_id: Uuid) -> DomainResult<u64> {
    let mut inner = self.inner.lock();
    let mut updated = 0u64;
    for notification in inner.notifications.values_mut() {
      if notification.user_id == user_id && !notification.is_read {
        notification.is_read = true;
        updated += 1;
      }
    }
    Ok(updated)
  }

  async fn delete_notification(&self, notification_id: Uuid, user_id: Uuid) -> DomainResult<()> {
    let mut inner = self.inner.lock();
    match inner.notifications.get(&notification_id) {
      Some(notification) if notification.user_id == user_id => {
        inner.notifications.remove(&notification_id);
        Ok(())
      }
      _ => Err(DomainError::NotFound(format!(
        "notification {} not found",
        notification_id
      ))),
    }
  }
}

#[async_trait]
impl UserDirectory for MemoryStore {
  async fn find_user(&self, user_id: Uuid) -> DomainResult<Option<User>> {
    Ok(self.inner.lock().users.get(&user_id).cloned())
  }

  async fn pharmacy_owner(&self, pharmacy_id: Uuid) -> DomainResult<Option<User>> {
    let inner = self.inner.lock();
    Ok(
      inner
        .users
        .values()
        .find(|u| u.role == crate::model::Role::Pharmacist && u.pharmacy_id == Some(pharmacy_id) && u.active)
        .cloned(),
    )
  }

  async fn available_drivers(&self) -> DomainResult<Vec<User>> {
    let inner = self.inner.lock();
    Ok(
      inner
        .users
        .values()
        .filter(|u| {
          u.role == crate::model::Role::Driver
            && u.active
            && inner.locations.get(&u.id).map(|l| l.available).unwrap_or(false)
        })
        .cloned()
        .collect(),
    )
  }

  async fn upsert_driver_location(&self, location: DriverLocation) -> DomainResult<()> {
    self.inner.lock().locations.insert(location.driver_id, location);
    Ok(())
  }

  async fn driver_location(&self, driver_id: Uuid) -> DomainResult<Option<DriverLocation>> {
    Ok(self.inner.lock().locations.get(&driver_id).cloned())
  }
}
