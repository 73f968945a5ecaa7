// tests/assignment_tests.rs
mod common; // Reference the common module

use common::*;
use pharmalink::{DomainError, NotificationStore, OrderStatus, OrderStore, Role};
use serial_test::serial;
use uuid::Uuid;

#[tokio::test]
#[serial]
async fn explicit_assignment_forces_ready_and_audits_the_driver() {
  setup_tracing();
  let h = harness();
  let pharmacy_id = Uuid::new_v4();
  let patient = seed_patient(&h.store, "Amine");
  let pharmacist = seed_pharmacist(&h.store, "Pharmacie Centrale", pharmacy_id);
  let admin = seed_admin(&h.store);
  let driver = seed_driver(&h.store, "Karim", Some(true)).await;
  let medicine = seed_medicine(&h.store, pharmacy_id, "Doliprane", 300, 10);

  let (order, _) = h
    .service
    .create_order(patient.id, order_request(pharmacy_id, &[(medicine.id, 1)]))
    .await
    .unwrap();
  h.service
    .submit_transition(pharmacist.id, Role::Pharmacist, order.id, transition(OrderStatus::Validated))
    .await
    .unwrap();
  h.service
    .submit_transition(admin.id, Role::Admin, order.id, transition(OrderStatus::Paid))
    .await
    .unwrap();
  h.service
    .submit_transition(pharmacist.id, Role::Pharmacist, order.id, transition(OrderStatus::Preparing))
    .await
    .unwrap();

  let assigned = h.service.assign_driver(order.id, pharmacist.id, driver.id).await.unwrap();
  assert_eq!(assigned.status, OrderStatus::Ready);
  assert_eq!(assigned.driver_id, Some(driver.id));

  let orders: &dyn OrderStore = h.store.as_ref();
  let tracking = orders.tracking_history(order.id).await.unwrap();
  assert_eq!(tracking.last().unwrap().message, "Livreur assigné: Karim");

  // Driver and patient both hear about it.
  let notifications: &dyn NotificationStore = h.store.as_ref();
  let driver_inbox = notifications.notifications_for_user(driver.id).await.unwrap();
  assert!(driver_inbox.iter().any(|n| n.title == "Nouvelle livraison assignée"));
  let patient_inbox = notifications.notifications_for_user(patient.id).await.unwrap();
  assert!(patient_inbox.iter().any(|n| n.title == "Livreur assigné"));
}

#[tokio::test]
#[serial]
async fn assignment_never_regresses_an_advanced_order() {
  setup_tracing();
  let h = harness();
  let pharmacy_id = Uuid::new_v4();
  let patient = seed_patient(&h.store, "Amine");
  let pharmacist = seed_pharmacist(&h.store, "Pharmacie Centrale", pharmacy_id);
  let admin = seed_admin(&h.store);
  let driver_a = seed_driver(&h.store, "Karim", Some(true)).await;
  let driver_b = seed_driver(&h.store, "Rachid", Some(true)).await;
  let medicine = seed_medicine(&h.store, pharmacy_id, "Doliprane", 300, 10);

  let (order, _) = h
    .service
    .create_order(patient.id, order_request(pharmacy_id, &[(medicine.id, 1)]))
    .await
    .unwrap();
  advance_to_ready(&h, order.id, &pharmacist, &admin).await;
  h.service
    .submit_transition(driver_a.id, Role::Driver, order.id, transition(OrderStatus::InTransit))
    .await
    .unwrap();

  // Re-assigning while in transit swaps the driver but keeps the status.
  let reassigned = h.service.assign_driver(order.id, admin.id, driver_b.id).await.unwrap();
  assert_eq!(reassigned.status, OrderStatus::InTransit);
  assert_eq!(reassigned.driver_id, Some(driver_b.id));
}

#[tokio::test]
#[serial]
async fn assignment_is_gated_and_validates_the_driver() {
  setup_tracing();
  let h = harness();
  let pharmacy_id = Uuid::new_v4();
  let patient = seed_patient(&h.store, "Amine");
  let pharmacist = seed_pharmacist(&h.store, "Pharmacie Centrale", pharmacy_id);
  let other_pharmacist = seed_pharmacist(&h.store, "Pharmacie B", Uuid::new_v4());
  let driver = seed_driver(&h.store, "Karim", Some(true)).await;
  let mut lazy_driver = make_user("Inactif", Role::Driver, None);
  lazy_driver.active = false;
  h.store.insert_user(lazy_driver.clone());
  let medicine = seed_medicine(&h.store, pharmacy_id, "Doliprane", 300, 10);

  let (order, _) = h
    .service
    .create_order(patient.id, order_request(pharmacy_id, &[(medicine.id, 1)]))
    .await
    .unwrap();

  // Only the owning pharmacy or an admin may assign.
  for requester in [patient.id, driver.id, other_pharmacist.id] {
    let err = h.service.assign_driver(order.id, requester, driver.id).await.unwrap_err();
    assert!(matches!(err, DomainError::AccessDenied(_)));
  }

  // The target must be an existing, active driver.
  let err = h.service.assign_driver(order.id, pharmacist.id, patient.id).await.unwrap_err();
  assert!(matches!(err, DomainError::Validation(_)));
  let err = h
    .service
    .assign_driver(order.id, pharmacist.id, lazy_driver.id)
    .await
    .unwrap_err();
  assert!(matches!(err, DomainError::Validation(_)));
  let err = h
    .service
    .assign_driver(order.id, pharmacist.id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
#[serial]
async fn ready_without_driver_broadcasts_to_available_drivers_only() {
  setup_tracing();
  let h = harness();
  let pharmacy_id = Uuid::new_v4();
  let patient = seed_patient(&h.store, "Amine");
  let pharmacist = seed_pharmacist(&h.store, "Pharmacie Centrale", pharmacy_id);
  let admin = seed_admin(&h.store);
  let available = seed_driver(&h.store, "Karim", Some(true)).await;
  let busy = seed_driver(&h.store, "Rachid", Some(false)).await;
  let offline = seed_driver(&h.store, "Sofiane", None).await;
  let medicine = seed_medicine(&h.store, pharmacy_id, "Doliprane", 300, 10);

  let (order, _) = h
    .service
    .create_order(patient.id, order_request(pharmacy_id, &[(medicine.id, 1)]))
    .await
    .unwrap();
  advance_to_ready(&h, order.id, &pharmacist, &admin).await;

  let notifications: &dyn NotificationStore = h.store.as_ref();
  let inbox = notifications.notifications_for_user(available.id).await.unwrap();
  assert!(inbox.iter().any(|n| n.title == "Nouvelle livraison disponible"));
  for excluded in [busy.id, offline.id] {
    let inbox = notifications.notifications_for_user(excluded).await.unwrap();
    assert!(inbox.is_empty(), "driver without available location must not be advertised");
  }
}

#[tokio::test]
#[serial]
async fn explicit_driver_during_ready_suppresses_the_broadcast() {
  setup_tracing();
  let h = harness();
  let pharmacy_id = Uuid::new_v4();
  let patient = seed_patient(&h.store, "Amine");
  let pharmacist = seed_pharmacist(&h.store, "Pharmacie Centrale", pharmacy_id);
  let admin = seed_admin(&h.store);
  let chosen = seed_driver(&h.store, "Karim", Some(true)).await;
  let bystander = seed_driver(&h.store, "Rachid", Some(true)).await;
  let medicine = seed_medicine(&h.store, pharmacy_id, "Doliprane", 300, 10);

  let (order, _) = h
    .service
    .create_order(patient.id, order_request(pharmacy_id, &[(medicine.id, 1)]))
    .await
    .unwrap();
  h.service
    .submit_transition(pharmacist.id, Role::Pharmacist, order.id, transition(OrderStatus::Validated))
    .await
    .unwrap();
  h.service
    .submit_transition(admin.id, Role::Admin, order.id, transition(OrderStatus::Paid))
    .await
    .unwrap();
  h.service
    .submit_transition(pharmacist.id, Role::Pharmacist, order.id, transition(OrderStatus::Preparing))
    .await
    .unwrap();

  let ready = h
    .service
    .submit_transition(
      pharmacist.id,
      Role::Pharmacist,
      order.id,
      pharmalink::TransitionRequest {
        status: OrderStatus::Ready,
        rejection_reason: None,
        driver_id: Some(chosen.id),
        location: None,
      },
    )
    .await
    .unwrap();
  assert_eq!(ready.driver_id, Some(chosen.id));

  let orders: &dyn OrderStore = h.store.as_ref();
  let tracking = orders.tracking_history(order.id).await.unwrap();
  assert!(tracking.last().unwrap().message.ends_with("Livreur: Karim"));

  let notifications: &dyn NotificationStore = h.store.as_ref();
  let chosen_inbox = notifications.notifications_for_user(chosen.id).await.unwrap();
  assert!(chosen_inbox.iter().any(|n| n.title == "Nouvelle livraison assignée"));
  let bystander_inbox = notifications.notifications_for_user(bystander.id).await.unwrap();
  assert!(
    !bystander_inbox.iter().any(|n| n.title == "Nouvelle livraison disponible"),
    "assigned orders are not broadcast"
  );
}

#[tokio::test]
#[serial]
async fn first_committer_wins_the_claim_race() {
  setup_tracing();
  let h = harness();
  let pharmacy_id = Uuid::new_v4();
  let patient = seed_patient(&h.store, "Amine");
  let pharmacist = seed_pharmacist(&h.store, "Pharmacie Centrale", pharmacy_id);
  let admin = seed_admin(&h.store);
  let driver_a = seed_driver(&h.store, "Karim", Some(true)).await;
  let driver_b = seed_driver(&h.store, "Rachid", Some(true)).await;
  let medicine = seed_medicine(&h.store, pharmacy_id, "Doliprane", 300, 10);

  let (order, _) = h
    .service
    .create_order(patient.id, order_request(pharmacy_id, &[(medicine.id, 1)]))
    .await
    .unwrap();
  advance_to_ready(&h, order.id, &pharmacist, &admin).await;

  let (result_a, result_b) = tokio::join!(
    h.service
      .submit_transition(driver_a.id, Role::Driver, order.id, transition(OrderStatus::InTransit)),
    h.service
      .submit_transition(driver_b.id, Role::Driver, order.id, transition(OrderStatus::InTransit)),
  );

  // Exactly one claimant commits; the loser gets a conflict to re-decide on.
  let (winner_id, loser) = match (&result_a, &result_b) {
    (Ok(_), Err(_)) => (driver_a.id, result_b),
    (Err(_), Ok(_)) => (driver_b.id, result_a),
    other => panic!("expected exactly one winner, got {:?}", other),
  };
  assert!(matches!(loser, Err(DomainError::Conflict(_))));

  let orders: &dyn OrderStore = h.store.as_ref();
  let after = orders.load_order(order.id).await.unwrap();
  assert_eq!(after.status, OrderStatus::InTransit);
  assert_eq!(after.driver_id, Some(winner_id));
}
