mod common;

use assert_matches::assert_matches;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use pharmstock_api::auth::{Principal, Role};
use pharmstock_api::entities::{receipt_log, warehouse_stock};
use pharmstock_api::errors::ServiceError;

use common::spawn_app;

#[tokio::test]
async fn adding_a_known_batch_name_merges_quantities() {
    let app = spawn_app().await;
    let medicine = app.seed_medicine("Amoxicillin 250mg").await;
    app.seed_batch(medicine, "BATCH-A", 30, "2026-12-31").await;
    app.seed_batch(medicine, "BATCH-A", 20, "2026-12-31").await;
    app.seed_batch(medicine, "BATCH-B", 10, "2027-03-31").await;

    let batches = app.warehouse_batches(medicine).await;
    assert_eq!(batches.len(), 2);
    assert_eq!(
        batches.iter().find(|b| b.batch_name == "BATCH-A").unwrap().quantity,
        50
    );

    // One purchase log row per booking, not per batch entry.
    let rows = receipt_log::Entity::find()
        .filter(receipt_log::Column::WarehouseId.eq(app.warehouse_id))
        .filter(receipt_log::Column::EntryType.eq("purchase"))
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn merging_cannot_overflow_a_batch_quantity() {
    let app = spawn_app().await;
    let medicine = app.seed_medicine("Paracetamol 500mg").await;
    app.seed_batch(medicine, "BULK", i32::MAX - 5, "2027-06-30").await;

    let err = app
        .services
        .stock_ledger
        .add_batch(
            app.warehouse,
            app.warehouse_id,
            medicine,
            common::new_batch("BULK", 10, "2027-06-30"),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let batches = app.warehouse_batches(medicine).await;
    assert_eq!(batches[0].quantity, i32::MAX - 5);
}

#[tokio::test]
async fn available_view_excludes_reserved_and_expired() {
    let app = spawn_app().await;
    let medicine = app.seed_medicine("ORS Sachet").await;
    app.seed_batch(medicine, "EXPIRED", 40, "2020-01-31").await;
    app.seed_batch(medicine, "LIVE", 30, "2099-12-31").await;

    let rows = app
        .services
        .stock_ledger
        .available_stock(app.warehouse_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].medicine_id, medicine);
    assert_eq!(rows[0].available_quantity, 30);
}

#[tokio::test]
async fn soft_delete_distinguishes_missing_from_foreign() {
    let app = spawn_app().await;
    let medicine = app.seed_medicine("Folic Acid 5mg").await;
    app.seed_batch(medicine, "F1", 10, "2027-01-31").await;
    let record = warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::WarehouseId.eq(app.warehouse_id))
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();

    let foreign = Principal {
        id: Uuid::new_v4(),
        role: Role::Warehouse,
    };
    let err = app
        .services
        .stock_ledger
        .soft_delete_warehouse_record(foreign, record.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    app.services
        .stock_ledger
        .soft_delete_warehouse_record(app.warehouse, record.id)
        .await
        .unwrap();

    // Already deleted now reads as missing, even for the owner.
    let err = app
        .services
        .stock_ledger
        .soft_delete_warehouse_record(app.warehouse, record.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .services
        .stock_ledger
        .soft_delete_warehouse_record(app.warehouse, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn detail_updates_never_touch_quantities() {
    let app = spawn_app().await;
    let medicine = app.seed_medicine("Ciprofloxacin 500mg").await;
    app.seed_batch(medicine, "C1", 60, "2026-12-31").await;
    let record = warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::WarehouseId.eq(app.warehouse_id))
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();

    let updated = app
        .services
        .stock_ledger
        .update_batch_details(
            app.warehouse,
            record.id,
            "C1",
            pharmstock_api::services::stock_ledger::BatchDetailUpdate {
                expiry_date: Some("2027-06-30".parse().unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let batches = updated.batches().unwrap();
    assert_eq!(batches[0].expiry_date, "2027-06-30".parse::<chrono::NaiveDate>().unwrap());
    assert_eq!(batches[0].quantity, 60);
    assert_eq!(batches[0].reserved_quantity, 0);
    assert_eq!(updated.version, record.version + 1);
}
