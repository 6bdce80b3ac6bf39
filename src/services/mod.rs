pub mod activity_logs;
pub mod catalog;
pub mod fulfillment;
pub mod receipts;
pub mod requirements;
pub mod reservations;
pub mod stock_ledger;
pub mod usage;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::events::EventSender;
use crate::services::requirements::ApprovalPolicy;

/// Everything the handlers need, built once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub stock_ledger: Arc<stock_ledger::StockLedgerService>,
    pub requirements: Arc<requirements::RequirementService>,
    pub fulfillment: Arc<fulfillment::FulfillmentService>,
    pub receipts: Arc<receipts::ReceiptService>,
    pub usage: Arc<usage::UsageService>,
    pub activity_logs: Arc<activity_logs::ActivityLogService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        policy: Arc<dyn ApprovalPolicy>,
    ) -> Self {
        let catalog = Arc::new(catalog::CatalogService::new());
        let reservations = Arc::new(reservations::ReservationService::new());
        Self {
            stock_ledger: Arc::new(stock_ledger::StockLedgerService::new(
                db.clone(),
                catalog.clone(),
                Some(event_sender.clone()),
            )),
            requirements: Arc::new(requirements::RequirementService::new(
                db.clone(),
                catalog,
                reservations.clone(),
                policy,
                Some(event_sender.clone()),
            )),
            fulfillment: Arc::new(fulfillment::FulfillmentService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            receipts: Arc::new(receipts::ReceiptService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            usage: Arc::new(usage::UsageService::new(db.clone(), Some(event_sender))),
            activity_logs: Arc::new(activity_logs::ActivityLogService::new(db)),
        }
    }
}
