// server/src/web/handlers/mod.rs

pub mod driver_handlers;
pub mod notification_handlers;
pub mod order_handlers;
pub mod realtime_handlers;
