// src/lib.rs

//! Pharmalink: the order lifecycle state machine and notification fan-out
//! engine for a pharmacy delivery marketplace.
//!
//! The crate owns the hard part of the marketplace backend:
//!  - A role-and-state-gated transition table for order statuses.
//!  - Atomic persistence of order + items + audit trail (+ driver field).
//!  - Post-commit domain events consumed by a notification dispatcher.
//!  - Best-effort real-time push over per-user rooms, backed by durable
//!    notification rows.
//!  - Driver assignment, explicit (pharmacy picks) or by broadcast
//!    (first driver to accept wins).
//!
//! Authentication, catalog CRUD, payments and file storage are external
//! collaborators: callers hand in an already-verified actor id and role.

// Declare modules according to the planned structure
pub mod assignment;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod model;
pub mod realtime;
pub mod store;
pub mod transition;

// --- Re-exports for the Public API ---

// Core domain types that callers interact with frequently
pub use crate::model::{
  DeliveryAddress, DriverLocation, GeoPoint, Medicine, Notification, NotificationKind, Order, OrderItem, OrderStatus,
  PaymentMethod, PaymentStatus, Role, TrackingUpdate, User,
};

pub use crate::assignment::DriverAssignmentResolver;
pub use crate::dispatch::{NewNotification, NotificationDispatcher};
pub use crate::events::{EventSink, OrderEvent};
pub use crate::lifecycle::{
  CreateOrderRequest, OrderDetail, OrderLifecycleService, OrderLineRequest, TransitionRequest,
};
pub use crate::realtime::{InProcessHub, RealtimeChannel, RealtimePush};
pub use crate::store::{
  memory::MemoryStore, postgres::PgStore, NewOrderLine, NotificationStore, OrderScope, OrderStore, UserDirectory,
};

pub use crate::error::{DomainError, DomainResult};
