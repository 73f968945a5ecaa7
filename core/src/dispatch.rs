// src/dispatch.rs

//! Notification fan-out.
//!
//! The dispatcher consumes post-commit domain events, persists one
//! notification row per recipient, and best-effort pushes the same payload
//! into the recipient's real-time room. Everything in this module is
//! deliberately lossy towards the triggering command: a missing recipient is
//! a silent no-op, and a failing insert or push for one recipient is logged
//! and swallowed without blocking the others, because the state change that
//! triggered it has already committed.

use crate::assignment::DriverAssignmentResolver;
use crate::error::DomainResult;
use crate::events::{EventSink, OrderEvent};
use crate::model::{Notification, NotificationKind, Order, OrderStatus, Role};
use crate::realtime::{RealtimeChannel, RealtimePush};
use crate::store::{NotificationStore, UserDirectory};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// What to tell one recipient.
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub title: String,
  pub message: String,
  pub kind: NotificationKind,
  pub order_id: Option<Uuid>,
}

pub struct NotificationDispatcher {
  notifications: Arc<dyn NotificationStore>,
  users: Arc<dyn UserDirectory>,
  resolver: DriverAssignmentResolver,
  channel: Arc<dyn RealtimeChannel>,
}

impl NotificationDispatcher {
  pub fn new(
    notifications: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    resolver: DriverAssignmentResolver,
    channel: Arc<dyn RealtimeChannel>,
  ) -> Self {
    Self {
      notifications,
      users,
      resolver,
      channel,
    }
  }

  /// Durably records a notification for `user_id`, then best-effort pushes
  /// it. Unknown recipients are a silent no-op so a stale user reference can
  /// never destabilize the caller.
  pub async fn notify(&self, user_id: Uuid, new: NewNotification) -> DomainResult<Option<Notification>> {
    if self.users.find_user(user_id).await?.is_none() {
      debug!(user_id = %user_id, "notification recipient no longer exists, skipping");
      return Ok(None);
    }

    let notification = self
      .notifications
      .insert_notification(Notification {
        id: Uuid::new_v4(),
        user_id,
        title: new.title,
        message: new.message,
        kind: new.kind,
        is_read: false,
        order_id: new.order_id,
        created_at: Utc::now(),
      })
      .await?;

    // The durable row above is the source of truth; the push is only a
    // latency optimization and its failure is not the caller's problem.
    if let Err(push_err) = self
      .channel
      .push(
        user_id,
        RealtimePush::Notification {
          notification: notification.clone(),
        },
      )
      .await
    {
      warn!(user_id = %user_id, error = %push_err, "real-time push failed, durable row remains pollable");
    }

    Ok(Some(notification))
  }

  /// [`Self::notify`] with the failure absorbed: fan-out is best-effort per
  /// recipient, so one failed insert never blocks the remaining recipients.
  async fn notify_or_log(&self, user_id: Uuid, new: NewNotification) {
    if let Err(notify_err) = self.notify(user_id, new).await {
      warn!(user_id = %user_id, error = %notify_err, "failed to record notification for recipient");
    }
  }

  // Owner-scoped notification reads/mutations, exposed for the HTTP surface.

  pub async fn notifications_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Notification>> {
    self.notifications.notifications_for_user(user_id).await
  }

  pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> DomainResult<Notification> {
    self.notifications.mark_notification_read(notification_id, user_id).await
  }

  pub async fn mark_all_read(&self, user_id: Uuid) -> DomainResult<u64> {
    self.notifications.mark_all_notifications_read(user_id).await
  }

  pub async fn delete(&self, notification_id: Uuid, user_id: Uuid) -> DomainResult<()> {
    self.notifications.delete_notification(notification_id, user_id).await
  }

  async fn fan_out(&self, event: OrderEvent) -> DomainResult<()> {
    match event {
      OrderEvent::Created { order } => {
        self
          .notify_or_log(
            order.patient_id,
            NewNotification {
              title: "Commande envoyée".to_string(),
              message: "Votre commande a été transmise à la pharmacie.".to_string(),
              kind: NotificationKind::Success,
              order_id: Some(order.id),
            },
          )
          .await;
        if let Some(owner) = self.users.pharmacy_owner(order.pharmacy_id).await? {
          self
            .notify_or_log(
              owner.id,
              NewNotification {
                title: "Nouvelle commande".to_string(),
                message: "Une nouvelle commande est en attente de validation.".to_string(),
                kind: NotificationKind::Info,
                order_id: Some(order.id),
              },
            )
            .await;
        }
      }

      OrderEvent::Transitioned {
        order,
        previous: _,
        actor_id: _,
        actor_role,
      } => {
        if let Some(patient_note) = patient_notification(&order) {
          self.notify_or_log(order.patient_id, patient_note).await;
        }

        // The pharmacy acts on its own transitions; it only needs to hear
        // about driver progress and admin overrides.
        if matches!(actor_role, Role::Driver | Role::Admin) {
          if let Some(owner) = self.users.pharmacy_owner(order.pharmacy_id).await? {
            if let Some(pharmacy_note) = pharmacy_notification(&order) {
              self.notify_or_log(owner.id, pharmacy_note).await;
            }
          }
        }

        if order.status == OrderStatus::Cancelled {
          if let Some(driver_id) = order.driver_id {
            self
              .notify_or_log(
                driver_id,
                NewNotification {
                  title: "Livraison annulée".to_string(),
                  message: "La commande qui vous était assignée a été annulée.".to_string(),
                  kind: NotificationKind::Warning,
                  order_id: Some(order.id),
                },
              )
              .await;
          }
        }

        // Broadcast assignment: a `ready` order with no driver is advertised
        // to every eligible driver; the first one to accept wins.
        if order.status == OrderStatus::Ready && order.driver_id.is_none() {
          for candidate in self.resolver.broadcast_candidates().await? {
            self
              .notify_or_log(
                candidate.id,
                NewNotification {
                  title: "Nouvelle livraison disponible".to_string(),
                  message: format!("Une livraison est disponible vers {}.", order.delivery_address.city),
                  kind: NotificationKind::Info,
                  order_id: Some(order.id),
                },
              )
              .await;
          }
        }
      }

      OrderEvent::DriverAssigned {
        order,
        driver,
        assigned_by: _,
      } => {
        self
          .notify_or_log(
            driver.id,
            NewNotification {
              title: "Nouvelle livraison assignée".to_string(),
              message: format!("Une livraison vous a été assignée vers {}.", order.delivery_address.city),
              kind: NotificationKind::Info,
              order_id: Some(order.id),
            },
          )
          .await;
        self
          .notify_or_log(
            order.patient_id,
            NewNotification {
              title: "Livreur assigné".to_string(),
              message: format!("{} livrera votre commande.", driver.name),
              kind: NotificationKind::Info,
              order_id: Some(order.id),
            },
          )
          .await;
      }

      OrderEvent::PrescriptionUpdated { order } => {
        if let Some(owner) = self.users.pharmacy_owner(order.pharmacy_id).await? {
          self
            .notify_or_log(
              owner.id,
              NewNotification {
                title: "Ordonnance mise à jour".to_string(),
                message: "Le patient a mis à jour l'ordonnance d'une commande en attente.".to_string(),
                kind: NotificationKind::Info,
                order_id: Some(order.id),
              },
            )
            .await;
        }
      }

      OrderEvent::DriverPinged {
        driver_id,
        latitude,
        longitude,
        moving_orders,
      } => {
        // Pings are ephemeral: pushed, never persisted.
        for order in moving_orders {
          if let Err(push_err) = self
            .channel
            .push(
              order.patient_id,
              RealtimePush::DriverLocation {
                order_id: order.id,
                driver_id,
                latitude,
                longitude,
              },
            )
            .await
          {
            warn!(order_id = %order.id, error = %push_err, "location push failed");
          }
        }
      }
    }
    Ok(())
  }
}

#[async_trait]
impl EventSink for NotificationDispatcher {
  async fn publish(&self, event: OrderEvent) {
    // The triggering transition has already committed; nothing that happens
    // here may surface to its caller.
    if let Err(fan_out_err) = self.fan_out(event).await {
      warn!(error = %fan_out_err, "notification fan-out failed after commit");
    }
  }
}

fn patient_notification(order: &Order) -> Option<NewNotification> {
  let (title, message, kind) = match order.status {
    OrderStatus::Pending => return None,
    OrderStatus::Validated => (
      "Commande validée",
      "Votre commande a été validée par la pharmacie.".to_string(),
      NotificationKind::Success,
    ),
    OrderStatus::Rejected => (
      "Commande rejetée",
      match &order.rejection_reason {
        Some(reason) => format!("Votre commande a été rejetée: {}", reason),
        None => "Votre commande a été rejetée.".to_string(),
      },
      NotificationKind::Error,
    ),
    OrderStatus::Paid => (
      "Paiement confirmé",
      "Le paiement de votre commande a été confirmé.".to_string(),
      NotificationKind::Success,
    ),
    OrderStatus::Preparing => (
      "Commande en préparation",
      "Votre commande est en cours de préparation.".to_string(),
      NotificationKind::Info,
    ),
    OrderStatus::Ready => (
      "Commande prête",
      "Votre commande est prête pour la livraison.".to_string(),
      NotificationKind::Info,
    ),
    OrderStatus::InTransit => (
      "Commande en route",
      "Votre commande est en cours de livraison.".to_string(),
      NotificationKind::Info,
    ),
    OrderStatus::Delivered => (
      "Commande livrée",
      "Votre commande a été livrée. Merci de votre confiance!".to_string(),
      NotificationKind::Success,
    ),
    OrderStatus::Cancelled => (
      "Commande annulée",
      "Votre commande a été annulée par l'administrateur.".to_string(),
      NotificationKind::Warning,
    ),
  };
  Some(NewNotification {
    title: title.to_string(),
    message,
    kind,
    order_id: Some(order.id),
  })
}

fn pharmacy_notification(order: &Order) -> Option<NewNotification> {
  let (title, message, kind) = match order.status {
    OrderStatus::InTransit => (
      "Livraison démarrée",
      "Un livreur a pris en charge la commande.".to_string(),
      NotificationKind::Info,
    ),
    OrderStatus::Delivered => (
      "Commande livrée",
      "La commande a été livrée au patient.".to_string(),
      NotificationKind::Success,
    ),
    OrderStatus::Cancelled => (
      "Commande annulée",
      "La commande a été annulée par l'administrateur.".to_string(),
      NotificationKind::Warning,
    ),
    _ => return None,
  };
  Some(NewNotification {
    title: title.to_string(),
    message,
    kind,
    order_id: Some(order.id),
  })
}
