// src/transition.rs

//! The transition authority: a pure decision function over
//! (actor, current order, requested status, payload).
//!
//! Nothing here touches storage. The lifecycle service asks this module for
//! an allow/deny decision plus the audit message to record, then performs
//! the atomic write. Keeping the tables total functions over the `Role` and
//! `OrderStatus` enums means adding a role or a status forces a compile-time
//! decision in every match below.

use crate::error::{DomainError, DomainResult};
use crate::model::{GeoPoint, Order, OrderStatus, Role, User};
use uuid::Uuid;

/// Bounds on the pharmacist-supplied rejection reason.
pub const REJECTION_REASON_MIN: usize = 3;
pub const REJECTION_REASON_MAX: usize = 500;

/// Audit message for the first tracking row, written at order creation.
pub const CREATED_MESSAGE: &str = "Commande créée, en attente de validation par la pharmacie";

/// Payload accompanying a transition request. Fields are only meaningful for
/// specific targets (`rejection_reason` for `rejected`, `driver_id` for
/// `ready`, `location` for driver-side updates).
#[derive(Debug, Clone, Default)]
pub struct TransitionPayload {
  pub rejection_reason: Option<String>,
  pub driver_id: Option<Uuid>,
  pub location: Option<GeoPoint>,
}

/// A granted transition: what to record in the audit trail, plus the gates
/// the store must enforce at commit time.
#[derive(Debug, Clone)]
pub struct TransitionDecision {
  /// Canned human-readable audit message for the tracking row.
  pub message: String,
  /// The driver claiming an unassigned `ready` order; commit must require
  /// `driver_id IS NULL` so at most one claimant wins the race.
  pub claim_driver: Option<Uuid>,
  /// Normalized rejection reason, present iff the target is `rejected`.
  pub rejection_reason: Option<String>,
}

/// The state machine: which targets are reachable from `current`.
///
/// `cancelled` is intentionally absent here: it is an admin-only override
/// from any non-terminal state, handled separately in [`authorize`].
pub fn allowed_targets(current: OrderStatus) -> &'static [OrderStatus] {
  match current {
    OrderStatus::Pending => &[OrderStatus::Validated, OrderStatus::Rejected],
    OrderStatus::Validated => &[OrderStatus::Paid],
    OrderStatus::Paid => &[OrderStatus::Preparing],
    OrderStatus::Preparing => &[OrderStatus::Ready],
    OrderStatus::Ready => &[OrderStatus::InTransit],
    OrderStatus::InTransit => &[OrderStatus::Delivered],
    OrderStatus::Delivered | OrderStatus::Rejected | OrderStatus::Cancelled => &[],
  }
}

/// The role gate: which targets a role may request at all. Ownership checks
/// (pharmacist owns the pharmacy, driver is the assignee) come on top.
pub fn role_targets(role: Role) -> &'static [OrderStatus] {
  match role {
    Role::Patient => &[],
    Role::Pharmacist => &[
      OrderStatus::Validated,
      OrderStatus::Rejected,
      OrderStatus::Preparing,
      OrderStatus::Ready,
    ],
    Role::Driver => &[OrderStatus::InTransit, OrderStatus::Delivered],
    Role::Admin => &OrderStatus::ALL,
  }
}

/// Canned audit message per target status.
pub fn audit_message(target: OrderStatus, rejection_reason: Option<&str>) -> String {
  match target {
    OrderStatus::Pending => CREATED_MESSAGE.to_string(),
    OrderStatus::Validated => "Commande validée par la pharmacie".to_string(),
    OrderStatus::Rejected => match rejection_reason {
      Some(reason) => format!("Commande rejetée: {}", reason),
      None => "Commande rejetée".to_string(),
    },
    OrderStatus::Paid => "Paiement confirmé".to_string(),
    OrderStatus::Preparing => "Commande en cours de préparation".to_string(),
    OrderStatus::Ready => "Commande prête pour la livraison".to_string(),
    OrderStatus::InTransit => "Commande en cours de livraison".to_string(),
    OrderStatus::Delivered => "Commande livrée".to_string(),
    OrderStatus::Cancelled => "Commande annulée par l'administrateur".to_string(),
  }
}

/// Decide whether `actor` may move `order` to `target`.
///
/// Check order matters for the error kind the caller sees:
/// 1. terminal state          -> `Conflict` (refresh and re-decide)
/// 2. state machine           -> `InvalidTransition`
/// 3. role gate + ownership   -> `AccessDenied`
/// 4. payload validation      -> `Validation`
///
/// All failures happen before any write; a granted decision carries the
/// audit message and the commit-time gates.
pub fn authorize(
  actor: &User,
  order: &Order,
  target: OrderStatus,
  payload: &TransitionPayload,
) -> DomainResult<TransitionDecision> {
  if order.status.is_terminal() {
    return Err(DomainError::Conflict(format!(
      "order {} is in terminal state '{}'",
      order.id, order.status
    )));
  }

  let state_allows = allowed_targets(order.status).contains(&target)
    || (target == OrderStatus::Cancelled && actor.role == Role::Admin);
  if !state_allows {
    return Err(DomainError::InvalidTransition {
      from: order.status,
      to: target,
    });
  }

  if !role_targets(actor.role).contains(&target) {
    return Err(DomainError::AccessDenied(format!(
      "role '{}' may not set an order to '{}'",
      actor.role, target
    )));
  }

  let mut claim_driver = None;
  match actor.role {
    Role::Pharmacist => {
      if actor.pharmacy_id != Some(order.pharmacy_id) {
        return Err(DomainError::AccessDenied(
          "pharmacist does not own this order's pharmacy".to_string(),
        ));
      }
    }
    Role::Driver => match order.driver_id {
      Some(assigned) if assigned == actor.id => {}
      // An unassigned `ready` order may be claimed by any driver; the
      // conditional update decides the race.
      None if target == OrderStatus::InTransit => claim_driver = Some(actor.id),
      _ => {
        return Err(DomainError::AccessDenied(
          "driver is not assigned to this order".to_string(),
        ));
      }
    },
    Role::Admin | Role::Patient => {}
  }

  let rejection_reason = if target == OrderStatus::Rejected {
    let reason = payload
      .rejection_reason
      .as_deref()
      .map(str::trim)
      .unwrap_or_default()
      .to_string();
    // Bounds are in characters, not bytes: accented reasons count normally.
    let reason_chars = reason.chars().count();
    if reason_chars < REJECTION_REASON_MIN {
      return Err(DomainError::Validation(format!(
        "a rejection reason of at least {} characters is required",
        REJECTION_REASON_MIN
      )));
    }
    if reason_chars > REJECTION_REASON_MAX {
      return Err(DomainError::Validation(format!(
        "rejection reason must not exceed {} characters",
        REJECTION_REASON_MAX
      )));
    }
    Some(reason)
  } else {
    None
  };

  Ok(TransitionDecision {
    message: audit_message(target, rejection_reason.as_deref()),
    claim_driver,
    rejection_reason,
  })
}
