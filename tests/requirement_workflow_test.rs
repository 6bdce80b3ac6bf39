mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use pharmstock_api::errors::ServiceError;
use pharmstock_api::models::{LineStatus, RequirementStatus};
use pharmstock_api::services::requirements::LineDecision;

use common::{approve_all, spawn_app, spawn_app_with_policy};

#[tokio::test]
async fn create_validates_references_and_quantities() {
    let app = spawn_app().await;
    let medicine = app.seed_medicine("Ibuprofen 400mg").await;

    let unknown = app
        .services
        .requirements
        .create(
            app.institution,
            app.institution_id,
            app.warehouse_id,
            vec![(Uuid::new_v4(), 10)],
        )
        .await
        .unwrap_err();
    assert_matches!(unknown, ServiceError::NotFound(_));

    let zero = app
        .services
        .requirements
        .create(
            app.institution,
            app.institution_id,
            app.warehouse_id,
            vec![(medicine, 0)],
        )
        .await
        .unwrap_err();
    assert_matches!(zero, ServiceError::ValidationError(_));

    let wrong_role = app
        .services
        .requirements
        .create(
            app.warehouse,
            app.institution_id,
            app.warehouse_id,
            vec![(medicine, 5)],
        )
        .await
        .unwrap_err();
    assert_matches!(wrong_role, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn only_the_target_warehouse_may_decide() {
    let app = spawn_app().await;
    let medicine = app.seed_medicine("Cetirizine 10mg").await;
    app.seed_batch(medicine, "C1", 50, "2026-12-31").await;
    let req = app
        .services
        .requirements
        .create(
            app.institution,
            app.institution_id,
            app.warehouse_id,
            vec![(medicine, 10)],
        )
        .await
        .unwrap();

    let stranger = pharmstock_api::auth::Principal {
        id: Uuid::new_v4(),
        role: pharmstock_api::auth::Role::Warehouse,
    };
    let err = app
        .services
        .requirements
        .decide(stranger, req.id, approve_all(&req))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn decisions_close_once_approved() {
    let app = spawn_app().await;
    let medicine = app.seed_medicine("Azithromycin 250mg").await;
    app.seed_batch(medicine, "A1", 50, "2026-12-31").await;
    let req = app
        .services
        .requirements
        .create(
            app.institution,
            app.institution_id,
            app.warehouse_id,
            vec![(medicine, 10)],
        )
        .await
        .unwrap();
    app.services
        .requirements
        .decide(app.warehouse, req.id, approve_all(&req))
        .await
        .unwrap();

    let err = app
        .services
        .requirements
        .decide(app.warehouse, req.id, approve_all(&req))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStateTransition(_));
}

#[tokio::test]
async fn reject_releases_reserved_stock() {
    let app = spawn_app_with_policy("line_level").await;
    let medicine = app.seed_medicine("Omeprazole 20mg").await;
    let other = app.seed_medicine("Pantoprazole 40mg").await;
    app.seed_batch(medicine, "O1", 50, "2026-12-31").await;
    app.seed_batch(other, "P1", 50, "2026-12-31").await;
    let req = app
        .services
        .requirements
        .create(
            app.institution,
            app.institution_id,
            app.warehouse_id,
            vec![(medicine, 20), (other, 10)],
        )
        .await
        .unwrap();
    // One line approved, one still pending keeps the requirement open.
    app.services
        .requirements
        .decide(
            app.warehouse,
            req.id,
            vec![LineDecision {
                medicine_id: medicine,
                status: LineStatus::Approved,
                approved_quantity: 20,
            }],
        )
        .await
        .unwrap();
    assert_eq!(app.warehouse_batches(medicine).await[0].reserved_quantity, 20);

    let rejected = app
        .services
        .requirements
        .reject(app.warehouse, req.id)
        .await
        .unwrap();
    assert_eq!(rejected.status().unwrap(), RequirementStatus::Rejected);
    assert_eq!(app.warehouse_batches(medicine).await[0].reserved_quantity, 0);
}

#[tokio::test]
async fn line_level_policy_rolls_up_partial_states() {
    let app = spawn_app_with_policy("line_level").await;
    let first = app.seed_medicine("Losartan 50mg").await;
    let second = app.seed_medicine("Atorvastatin 20mg").await;
    app.seed_batch(first, "L1", 100, "2026-12-31").await;
    app.seed_batch(second, "A1", 100, "2026-12-31").await;
    let req = app
        .services
        .requirements
        .create(
            app.institution,
            app.institution_id,
            app.warehouse_id,
            vec![(first, 30), (second, 40)],
        )
        .await
        .unwrap();

    // Partial approval of the first line only.
    let partial = app
        .services
        .requirements
        .decide(
            app.warehouse,
            req.id,
            vec![LineDecision {
                medicine_id: first,
                status: LineStatus::Approved,
                approved_quantity: 25,
            }],
        )
        .await
        .unwrap();
    assert_eq!(
        partial.status().unwrap(),
        RequirementStatus::PartiallyApproved
    );
    assert_eq!(app.warehouse_batches(first).await[0].reserved_quantity, 25);

    // Lowering an approved quantity releases the delta.
    app.services
        .requirements
        .decide(
            app.warehouse,
            req.id,
            vec![LineDecision {
                medicine_id: first,
                status: LineStatus::Approved,
                approved_quantity: 10,
            }],
        )
        .await
        .unwrap();
    assert_eq!(app.warehouse_batches(first).await[0].reserved_quantity, 10);

    // Deciding the remaining line settles the rollup.
    let settled = app
        .services
        .requirements
        .decide(
            app.warehouse,
            req.id,
            vec![LineDecision {
                medicine_id: second,
                status: LineStatus::Rejected,
                approved_quantity: 0,
            }],
        )
        .await
        .unwrap();
    assert_eq!(
        settled.status().unwrap(),
        RequirementStatus::PartiallyApproved
    );
}

#[tokio::test]
async fn all_or_nothing_policy_refuses_partial_decisions() {
    let app = spawn_app().await;
    let medicine = app.seed_medicine("Ranitidine 150mg").await;
    app.seed_batch(medicine, "R1", 50, "2026-12-31").await;
    let req = app
        .services
        .requirements
        .create(
            app.institution,
            app.institution_id,
            app.warehouse_id,
            vec![(medicine, 20)],
        )
        .await
        .unwrap();

    let err = app
        .services
        .requirements
        .decide(
            app.warehouse,
            req.id,
            vec![LineDecision {
                medicine_id: medicine,
                status: LineStatus::Approved,
                approved_quantity: 15,
            }],
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(app.warehouse_batches(medicine).await[0].reserved_quantity, 0);
}
