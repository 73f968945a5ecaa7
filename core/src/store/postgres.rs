// src/store/postgres.rs

//! Postgres-backed store. DDL lives in `schema.sql` at the workspace root.
//!
//! Stock rows are taken with `SELECT ... FOR UPDATE` during order creation,
//! and transitions use a conditional `UPDATE ... WHERE status = $expected`
//! so the race-safety guarantees hold regardless of the pool's isolation
//! level.

use crate::error::{DomainError, DomainResult};
use crate::model::{DriverLocation, Medicine, Notification, Order, OrderItem, TrackingUpdate, User};
use crate::store::{CreateOrder, NotificationStore, OrderScope, OrderStore, TransitionWrite, UserDirectory};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn create_order(&self, req: CreateOrder) -> DomainResult<(Order, Vec<OrderItem>)> {
    let mut tx = self.pool.begin().await?;
    let now = Utc::now();
    let order_id = Uuid::new_v4();

    // Resolve snapshots and decrement stock under row locks, so concurrent
    // orders for the same medicine cannot oversell.
    let mut snapshots: Vec<(Medicine, i32)> = Vec::with_capacity(req.items.len());
    for line in &req.items {
      let medicine = sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = $1 FOR UPDATE")
        .bind(line.medicine_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("medicine {} not found", line.medicine_id)))?;

      if medicine.pharmacy_id != req.pharmacy_id {
        return Err(DomainError::Validation(format!(
          "medicine '{}' is not sold by this pharmacy",
          medicine.name
        )));
      }
      if medicine.quantity < line.quantity {
        // Dropping the transaction rolls back every earlier decrement.
        return Err(DomainError::InsufficientStock {
          medicine: medicine.name,
          requested: line.quantity,
          available: medicine.quantity,
        });
      }

      sqlx::query("UPDATE medicines SET quantity = quantity - $1 WHERE id = $2")
        .bind(line.quantity)
        .bind(line.medicine_id)
        .execute(&mut *tx)
        .await?;

      snapshots.push((medicine, line.quantity));
    }

    let total: i64 = snapshots
      .iter()
      .map(|(medicine, quantity)| medicine.price * i64::from(*quantity))
      .sum();

    let order = sqlx::query_as::<_, Order>(
      "INSERT INTO orders (
         id, patient_id, pharmacy_id, driver_id, status, total, delivery_fee,
         prescription_url, rejection_reason,
         delivery_street, delivery_city, delivery_postal_code, delivery_country,
         delivery_latitude, delivery_longitude,
         payment_method, payment_status, estimated_delivery, delivered_at,
         created_at, updated_at
       ) VALUES (
         $1, $2, $3, NULL, 'pending', $4, $5,
         $6, NULL,
         $7, $8, $9, $10,
         $11, $12,
         $13, 'pending', NULL, NULL,
         $14, $14
       ) RETURNING *",
    )
    .bind(order_id)
    .bind(req.patient_id)
    .bind(req.pharmacy_id)
    .bind(total)
    .bind(req.delivery_fee)
    .bind(&req.prescription_url)
    .bind(&req.delivery_address.street)
    .bind(&req.delivery_address.city)
    .bind(&req.delivery_address.postal_code)
    .bind(&req.delivery_address.country)
    .bind(req.delivery_address.latitude)
    .bind(req.delivery_address.longitude)
    .bind(req.payment_method)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(snapshots.len());
    for (medicine, quantity) in &snapshots {
      let item = sqlx::query_as::<_, OrderItem>(
        "INSERT INTO order_items (
           id, order_id, medicine_id, medicine_name, unit_price, quantity,
           requires_prescription, created_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
      )
      .bind(Uuid::new_v4())
      .bind(order_id)
      .bind(medicine.id)
      .bind(&medicine.name)
      .bind(medicine.price)
      .bind(quantity)
      .bind(medicine.requires_prescription)
      .bind(now)
      .fetch_one(&mut *tx)
      .await?;
      items.push(item);
    }

    sqlx::query(
      "INSERT INTO tracking_updates (id, order_id, status, message, latitude, longitude, created_at)
       VALUES ($1, $2, 'pending', $3, NULL, NULL, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(&req.audit_message)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    debug!(order_id = %order_id, total, "order created");
    Ok((order, items))
  }

  async fn load_order(&self, order_id: Uuid) -> DomainResult<Order> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| DomainError::NotFound(format!("order {} not found", order_id)))
  }

  async fn list_orders(&self, scope: OrderScope) -> DomainResult<Vec<Order>> {
    let orders = match scope {
      OrderScope::Patient(patient_id) => {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE patient_id = $1 ORDER BY created_at DESC")
          .bind(patient_id)
          .fetch_all(&self.pool)
          .await?
      }
      OrderScope::Pharmacy(pharmacy_id) => {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE pharmacy_id = $1 ORDER BY created_at DESC")
          .bind(pharmacy_id)
          .fetch_all(&self.pool)
          .await?
      }
      OrderScope::Driver(driver_id) => {
        sqlx::query_as::<_, Order>(
          "SELECT * FROM orders
           WHERE driver_id = $1 OR (status = 'ready' AND driver_id IS NULL)
           ORDER BY created_at DESC",
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?
      }
      OrderScope::All => {
        sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
          .fetch_all(&self.pool)
          .await?
      }
    };
    Ok(orders)
  }

  async fn order_items(&self, order_id: Uuid) -> DomainResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at")
      .bind(order_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(items)
  }

  async fn tracking_history(&self, order_id: Uuid) -> DomainResult<Vec<TrackingUpdate>> {
    let rows =
      sqlx::query_as::<_, TrackingUpdate>("SELECT * FROM tracking_updates WHERE order_id = $1 ORDER BY created_at")
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
    Ok(rows)
  }

  async fn apply_transition(&self, order_id: Uuid, write: TransitionWrite) -> DomainResult<Order> {
    let mut tx = self.pool.begin().await?;
    let now = Utc::now();

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE id = $1")
      .bind(order_id)
      .fetch_one(&mut *tx)
      .await?;
    if exists == 0 {
      return Err(DomainError::NotFound(format!("order {} not found", order_id)));
    }

    // Compare-and-set on the previously observed status (and on the driver
    // slot when a driver claims an unassigned order): of two racing
    // transitions at most one row matches, the other caller gets Conflict.
    let mut sql = String::from(
      "UPDATE orders
          SET status = $1,
              rejection_reason = COALESCE($2::text, rejection_reason),
              driver_id = COALESCE($3::uuid, driver_id),
              delivered_at = CASE WHEN $4::bool AND delivered_at IS NULL THEN $5 ELSE delivered_at END,
              updated_at = $5
        WHERE id = $6 AND status = $7",
    );
    if write.require_unassigned {
      sql.push_str(" AND driver_id IS NULL");
    }
    sql.push_str(" RETURNING *");

    let updated = sqlx::query_as::<_, Order>(&sql)
      .bind(write.new_status)
      .bind(&write.rejection_reason)
      .bind(write.set_driver)
      .bind(write.stamp_delivered)
      .bind(now)
      .bind(order_id)
      .bind(write.expected_status)
      .fetch_optional(&mut *tx)
      .await?
      .ok_or_else(|| {
        DomainError::Conflict(format!(
          "order {} changed concurrently (expected status '{}')",
          order_id, write.expected_status
        ))
      })?;

    sqlx::query(
      "INSERT INTO tracking_updates (id, order_id, status, message, latitude, longitude, created_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(write.new_status)
    .bind(&write.audit_message)
    .bind(write.location.map(|p| p.latitude))
    .bind(write.location.map(|p| p.longitude))
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    debug!(order_id = %order_id, status = %updated.status, "transition committed");
    Ok(updated)
  }

  async fn update_prescription(&self, order_id: Uuid, prescription_url: &str) -> DomainResult<Order> {
    let updated = sqlx::query_as::<_, Order>(
      "UPDATE orders SET prescription_url = $2, updated_at = $3
       WHERE id = $1 AND status = 'pending' RETURNING *",
    )
    .bind(order_id)
    .bind(prescription_url)
    .bind(Utc::now())
    .fetch_optional(&self.pool)
    .await?;

    match updated {
      Some(order) => Ok(order),
      None => {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE id = $1")
          .bind(order_id)
          .fetch_one(&self.pool)
          .await?;
        if exists == 0 {
          Err(DomainError::NotFound(format!("order {} not found", order_id)))
        } else {
          Err(DomainError::Conflict(
            "prescription can only be updated while the order is pending".to_string(),
          ))
        }
      }
    }
  }

  async fn orders_in_transit_for_driver(&self, driver_id: Uuid) -> DomainResult<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE driver_id = $1 AND status = 'in_transit'")
      .bind(driver_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(orders)
  }
}

#[async_trait]
impl NotificationStore for PgStore {
  async fn insert_notification(&self, notification: Notification) -> DomainResult<Notification> {
    let inserted = sqlx::query_as::<_, Notification>(
      "INSERT INTO notifications (id, user_id, title, message, kind, is_read, order_id, created_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(notification.id)
    .bind(notification.user_id)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.kind)
    .bind(notification.is_read)
    .bind(notification.order_id)
    .bind(notification.created_at)
    .fetch_one(&self.pool)
    .await?;
    Ok(inserted)
  }

  async fn notifications_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Notification>> {
    let rows =
      sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
    Ok(rows)
  }

  async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> DomainResult<Notification> {
    sqlx::query_as::<_, Notification>(
      "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(notification_id)
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| DomainError::NotFound(format!("notification {} not found", notification_id)))
  }

  async fn mark_all_notifications_read(&self, user_id: Uuid) -> DomainResult<u64> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }

  async fn delete_notification(&self, notification_id: Uuid, user_id: Uuid) -> DomainResult<()> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
      .bind(notification_id)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(DomainError::NotFound(format!(
        "notification {} not found",
        notification_id
      )));
    }
    Ok(())
  }
}

#[async_trait]
impl UserDirectory for PgStore {
  async fn find_user(&self, user_id: Uuid) -> DomainResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(user)
  }

  async fn pharmacy_owner(&self, pharmacy_id: Uuid) -> DomainResult<Option<User>> {
    let owner = sqlx::query_as::<_, User>(
      "SELECT * FROM users WHERE role = 'pharmacist' AND pharmacy_id = $1 AND active LIMIT 1",
    )
    .bind(pharmacy_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(owner)
  }

  async fn available_drivers(&self) -> DomainResult<Vec<User>> {
    let drivers = sqlx::query_as::<_, User>(
      "SELECT u.* FROM users u
       JOIN driver_locations dl ON dl.driver_id = u.id
       WHERE u.role = 'driver' AND u.active AND dl.available",
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(drivers)
  }

  async fn upsert_driver_location(&self, location: DriverLocation) -> DomainResult<()> {
    sqlx::query(
      "INSERT INTO driver_locations (driver_id, latitude, longitude, available, updated_at)
       VALUES ($1, $2, $3, $4, $5)
       ON CONFLICT (driver_id) DO UPDATE
       SET latitude = EXCLUDED.latitude,
           longitude = EXCLUDED.longitude,
           available = EXCLUDED.available,
           updated_at = EXCLUDED.updated_at",
    )
    .bind(location.driver_id)
    .bind(location.latitude)
    .bind(location.longitude)
    .bind(location.available)
    .bind(location.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn driver_location(&self, driver_id: Uuid) -> DomainResult<Option<DriverLocation>> {
    let location = sqlx::query_as::<_, DriverLocation>("SELECT * FROM driver_locations WHERE driver_id = $1")
      .bind(driver_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(location)
  }
}
