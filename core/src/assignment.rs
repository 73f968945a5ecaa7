// src/assignment.rs

//! Driver assignment: validation for explicit assignment (the pharmacy or an
//! admin picks a driver) and the candidate query for broadcast assignment
//! (every eligible driver is advertised the delivery; the first to accept
//! wins at the store's conditional update).

use crate::error::{DomainError, DomainResult};
use crate::model::{Role, User};
use crate::store::UserDirectory;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct DriverAssignmentResolver {
  users: Arc<dyn UserDirectory>,
}

impl DriverAssignmentResolver {
  pub fn new(users: Arc<dyn UserDirectory>) -> Self {
    Self { users }
  }

  /// Checks that the target of an explicit assignment exists, is a driver,
  /// and has an active account.
  pub async fn validate_driver(&self, driver_id: Uuid) -> DomainResult<User> {
    let user = self
      .users
      .find_user(driver_id)
      .await?
      .ok_or_else(|| DomainError::NotFound(format!("driver {} not found", driver_id)))?;
    if user.role != Role::Driver {
      return Err(DomainError::Validation(format!(
        "user {} is not a driver",
        driver_id
      )));
    }
    if !user.active {
      return Err(DomainError::Validation(format!("driver {} is not active", driver_id)));
    }
    Ok(user)
  }

  /// Active drivers with an available location, i.e. the broadcast pool for
  /// an order that reached `ready` without an explicit driver. No nearest-
  /// driver auto-assignment happens here: assignment stays a pull.
  pub async fn broadcast_candidates(&self) -> DomainResult<Vec<User>> {
    self.users.available_drivers().await
  }
}
