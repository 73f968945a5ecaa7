// src/store/mod.rs

//! Persistence contracts for the order aggregate, notifications and the
//! user/driver directory.
//!
//! All multi-row writes (order + items + first tracking row on create;
//! order + tracking row [+ driver field] on transition) are atomic: either
//! everything commits or nothing does. Transitions are guarded by a
//! conditional update on the previously observed status (and on
//! `driver_id IS NULL` when a driver claims an unassigned order), so two
//! racing transitions on the same order can never both succeed.

pub mod memory;
pub mod postgres;

use crate::error::DomainResult;
use crate::model::{
  DeliveryAddress, DriverLocation, GeoPoint, Notification, Order, OrderItem, OrderStatus, PaymentMethod,
  TrackingUpdate, User,
};
use async_trait::async_trait;
use uuid::Uuid;

/// One requested line of a new order; the store resolves the snapshot and
/// checks stock inside the creation transaction.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
  pub medicine_id: Uuid,
  pub quantity: i32,
}

/// Everything the store needs to create an order atomically.
#[derive(Debug, Clone)]
pub struct CreateOrder {
  pub patient_id: Uuid,
  pub pharmacy_id: Uuid,
  pub items: Vec<NewOrderLine>,
  pub delivery_address: DeliveryAddress,
  pub prescription_url: Option<String>,
  pub payment_method: PaymentMethod,
  pub delivery_fee: i64,
  /// Message for the first tracking row.
  pub audit_message: String,
}

/// The atomic write for one granted transition.
///
/// `expected_status` (and `require_unassigned`) turn the write into a
/// compare-and-set: if the row no longer matches, the store reports
/// `Conflict` and writes nothing.
#[derive(Debug, Clone)]
pub struct TransitionWrite {
  pub new_status: OrderStatus,
  pub expected_status: OrderStatus,
  pub require_unassigned: bool,
  pub set_driver: Option<Uuid>,
  pub rejection_reason: Option<String>,
  pub stamp_delivered: bool,
  pub audit_message: String,
  pub location: Option<GeoPoint>,
}

/// Role-dependent visibility filter for order listings.
#[derive(Debug, Clone, Copy)]
pub enum OrderScope {
  /// The patient's own orders.
  Patient(Uuid),
  /// Orders placed at the given pharmacy.
  Pharmacy(Uuid),
  /// Orders assigned to the driver, plus unassigned `ready` orders.
  Driver(Uuid),
  /// Everything (admin).
  All,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Creates order + items + first tracking row in one transaction,
  /// decrementing catalog stock per item. Insufficient stock on any item
  /// aborts the whole order.
  async fn create_order(&self, req: CreateOrder) -> DomainResult<(Order, Vec<OrderItem>)>;

  async fn load_order(&self, order_id: Uuid) -> DomainResult<Order>;

  async fn list_orders(&self, scope: OrderScope) -> DomainResult<Vec<Order>>;

  async fn order_items(&self, order_id: Uuid) -> DomainResult<Vec<OrderItem>>;

  /// Tracking rows for an order, oldest first.
  async fn tracking_history(&self, order_id: Uuid) -> DomainResult<Vec<TrackingUpdate>>;

  /// Applies one transition atomically (order row + tracking row). Returns
  /// `Conflict` if the compare-and-set gates no longer hold, `NotFound` if
  /// the order does not exist.
  async fn apply_transition(&self, order_id: Uuid, write: TransitionWrite) -> DomainResult<Order>;

  /// Replaces the prescription reference while the order is still `pending`.
  async fn update_prescription(&self, order_id: Uuid, prescription_url: &str) -> DomainResult<Order>;

  /// The driver's currently moving deliveries, for location fan-out.
  async fn orders_in_transit_for_driver(&self, driver_id: Uuid) -> DomainResult<Vec<Order>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
  async fn insert_notification(&self, notification: Notification) -> DomainResult<Notification>;

  /// Newest first.
  async fn notifications_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Notification>>;

  async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> DomainResult<Notification>;

  async fn mark_all_notifications_read(&self, user_id: Uuid) -> DomainResult<u64>;

  async fn delete_notification(&self, notification_id: Uuid, user_id: Uuid) -> DomainResult<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
  async fn find_user(&self, user_id: Uuid) -> DomainResult<Option<User>>;

  /// The pharmacist owning the given pharmacy, if any.
  async fn pharmacy_owner(&self, pharmacy_id: Uuid) -> DomainResult<Option<User>>;

  /// Active drivers with an available last-known location.
  async fn available_drivers(&self) -> DomainResult<Vec<User>>;

  /// Idempotent upsert of a driver's last-known position.
  async fn upsert_driver_location(&self, location: DriverLocation) -> DomainResult<()>;

  async fn driver_location(&self, driver_id: Uuid) -> DomainResult<Option<DriverLocation>>;
}
