// src/model/mod.rs

//! Data structures representing database entities of the order domain.

// Declare child modules for each model
pub mod driver;
pub mod medicine;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod tracking;
pub mod user;

// Re-export the model structs for convenient access
pub use driver::DriverLocation;
pub use medicine::Medicine;
pub use notification::{Notification, NotificationKind};
pub use order::{DeliveryAddress, Order, OrderStatus, PaymentMethod, PaymentStatus};
pub use order_item::OrderItem;
pub use tracking::{GeoPoint, TrackingUpdate};
pub use user::{Role, User};
