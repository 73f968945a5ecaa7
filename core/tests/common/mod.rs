// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use pharmalink::{
  CreateOrderRequest, DeliveryAddress, DomainError, DomainResult, DriverAssignmentResolver, DriverLocation,
  EventSink, Medicine, MemoryStore, NotificationDispatcher, NotificationStore, Order, OrderLifecycleService,
  OrderLineRequest, OrderStatus, OrderStore, PaymentMethod, PaymentStatus, RealtimeChannel, RealtimePush, Role,
  TransitionRequest, User, UserDirectory,
};

pub fn setup_tracing() {
  use once_cell::sync::Lazy;
  static INIT: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();
  });
  Lazy::force(&INIT);
}

// --- Channels ---

/// Records every push so tests can assert on best-effort delivery.
#[derive(Default)]
pub struct RecordingChannel {
  pushes: Mutex<Vec<(Uuid, RealtimePush)>>,
}

impl RecordingChannel {
  pub fn pushes(&self) -> Vec<(Uuid, RealtimePush)> {
    self.pushes.lock().clone()
  }

  pub fn pushes_for(&self, user_id: Uuid) -> Vec<RealtimePush> {
    self
      .pushes
      .lock()
      .iter()
      .filter(|(recipient, _)| *recipient == user_id)
      .map(|(_, push)| push.clone())
      .collect()
  }
}

#[async_trait]
impl RealtimeChannel for RecordingChannel {
  async fn push(&self, user_id: Uuid, payload: RealtimePush) -> DomainResult<()> {
    self.pushes.lock().push((user_id, payload));
    Ok(())
  }
}

/// Simulates a realtime outage: every push fails.
#[derive(Default)]
pub struct FailingChannel;

#[async_trait]
impl RealtimeChannel for FailingChannel {
  async fn push(&self, _user_id: Uuid, _payload: RealtimePush) -> DomainResult<()> {
    Err(DomainError::Internal(anyhow::anyhow!("simulated push outage")))
  }
}

// --- Harness ---

pub struct Harness {
  pub store: Arc<MemoryStore>,
  pub service: Arc<OrderLifecycleService>,
  pub dispatcher: Arc<NotificationDispatcher>,
  pub pushes: Arc<RecordingChannel>,
}

pub fn harness() -> Harness {
  let pushes = Arc::new(RecordingChannel::default());
  let (store, service, dispatcher) = build_engine(pushes.clone());
  Harness {
    store,
    service,
    dispatcher,
    pushes,
  }
}

pub fn build_engine(
  channel: Arc<dyn RealtimeChannel>,
) -> (Arc<MemoryStore>, Arc<OrderLifecycleService>, Arc<NotificationDispatcher>) {
  let store = Arc::new(MemoryStore::new());
  let orders: Arc<dyn OrderStore> = store.clone();
  let users: Arc<dyn UserDirectory> = store.clone();
  let notifications: Arc<dyn NotificationStore> = store.clone();

  let resolver = DriverAssignmentResolver::new(users.clone());
  let dispatcher = Arc::new(NotificationDispatcher::new(
    notifications,
    users.clone(),
    resolver.clone(),
    channel,
  ));
  let events: Arc<dyn EventSink> = dispatcher.clone();
  let service = Arc::new(OrderLifecycleService::new(orders, users, resolver, events));
  (store, service, dispatcher)
}

// --- Seeding helpers ---

pub fn make_user(name: &str, role: Role, pharmacy_id: Option<Uuid>) -> User {
  User {
    id: Uuid::new_v4(),
    name: name.to_string(),
    email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
    role,
    pharmacy_id,
    active: true,
    created_at: Utc::now(),
  }
}

pub fn seed_patient(store: &MemoryStore, name: &str) -> User {
  let user = make_user(name, Role::Patient, None);
  store.insert_user(user.clone());
  user
}

pub fn seed_pharmacist(store: &MemoryStore, name: &str, pharmacy_id: Uuid) -> User {
  let user = make_user(name, Role::Pharmacist, Some(pharmacy_id));
  store.insert_user(user.clone());
  user
}

pub fn seed_admin(store: &MemoryStore) -> User {
  let user = make_user("Admin", Role::Admin, None);
  store.insert_user(user.clone());
  user
}

/// Seeds a driver; `location_available` controls whether a `DriverLocation`
/// exists and whether it is marked available.
pub async fn seed_driver(store: &Arc<MemoryStore>, name: &str, location_available: Option<bool>) -> User {
  let user = make_user(name, Role::Driver, None);
  store.insert_user(user.clone());
  if let Some(available) = location_available {
    let users: &dyn UserDirectory = store.as_ref();
    users
      .upsert_driver_location(DriverLocation {
        driver_id: user.id,
        latitude: 36.75,
        longitude: 3.06,
        available,
        updated_at: Utc::now(),
      })
      .await
      .unwrap();
  }
  user
}

pub fn seed_medicine(store: &MemoryStore, pharmacy_id: Uuid, name: &str, price: i64, quantity: i32) -> Medicine {
  let medicine = Medicine {
    id: Uuid::new_v4(),
    pharmacy_id,
    name: name.to_string(),
    price,
    quantity,
    requires_prescription: false,
    created_at: Utc::now(),
  };
  store.insert_medicine(medicine.clone());
  medicine
}

pub fn test_address() -> DeliveryAddress {
  DeliveryAddress {
    street: "12 rue des Oliviers".to_string(),
    city: "Alger".to_string(),
    postal_code: "16000".to_string(),
    country: "DZ".to_string(),
    latitude: None,
    longitude: None,
  }
}

pub fn order_request(pharmacy_id: Uuid, lines: &[(Uuid, i32)]) -> CreateOrderRequest {
  CreateOrderRequest {
    pharmacy_id,
    items: lines
      .iter()
      .map(|(medicine_id, quantity)| OrderLineRequest {
        medicine_id: *medicine_id,
        quantity: *quantity,
      })
      .collect(),
    delivery_address: test_address(),
    prescription_url: None,
    payment_method: PaymentMethod::CashOnDelivery,
    delivery_fee: 0,
  }
}

pub fn transition(target: OrderStatus) -> TransitionRequest {
  TransitionRequest {
    status: target,
    rejection_reason: None,
    driver_id: None,
    location: None,
  }
}

/// A synthetic order for exercising the pure transition authority.
pub fn order_with(status: OrderStatus, patient_id: Uuid, pharmacy_id: Uuid, driver_id: Option<Uuid>) -> Order {
  let now = Utc::now();
  Order {
    id: Uuid::new_v4(),
    patient_id,
    pharmacy_id,
    driver_id,
    status,
    total: 1200,
    delivery_fee: 0,
    prescription_url: None,
    rejection_reason: None,
    delivery_address: test_address(),
    payment_method: PaymentMethod::CashOnDelivery,
    payment_status: PaymentStatus::Pending,
    estimated_delivery: None,
    delivered_at: None,
    created_at: now,
    updated_at: now,
  }
}

/// Drives a pending order along the happy path up to `ready`, unassigned.
pub async fn advance_to_ready(harness: &Harness, order_id: Uuid, pharmacist: &User, admin: &User) {
  harness
    .service
    .submit_transition(pharmacist.id, Role::Pharmacist, order_id, transition(OrderStatus::Validated))
    .await
    .unwrap();
  harness
    .service
    .submit_transition(admin.id, Role::Admin, order_id, transition(OrderStatus::Paid))
    .await
    .unwrap();
  harness
    .service
    .submit_transition(pharmacist.id, Role::Pharmacist, order_id, transition(OrderStatus::Preparing))
    .await
    .unwrap();
  harness
    .service
    .submit_transition(pharmacist.id, Role::Pharmacist, order_id, transition(OrderStatus::Ready))
    .await
    .unwrap();
}
