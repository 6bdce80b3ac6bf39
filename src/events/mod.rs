use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::notifications::NotificationService;

/// Domain events emitted after successful commits. Consumed by the central
/// processing loop for logging and notification fan-out.
#[derive(Debug, Clone, Serialize)]
pub enum Event {
    StockAdded {
        warehouse_id: Uuid,
        medicine_id: Uuid,
        batch_name: String,
        quantity: i32,
    },
    StockReserved {
        warehouse_id: Uuid,
        medicine_id: Uuid,
        quantity: i32,
        requirement_id: Uuid,
    },
    ReservationReleased {
        warehouse_id: Uuid,
        medicine_id: Uuid,
        quantity: i32,
        requirement_id: Uuid,
    },
    RequirementCreated {
        requirement_id: Uuid,
        institution_id: Uuid,
        warehouse_id: Uuid,
        line_count: usize,
    },
    RequirementDecided {
        requirement_id: Uuid,
        institution_id: Uuid,
        overall_status: String,
    },
    ShipmentCreated {
        logistic_id: Uuid,
        shipment_id: String,
        requirement_id: Uuid,
        institution_id: Uuid,
    },
    ShipmentDelivered {
        logistic_id: Uuid,
        shipment_id: String,
        institution_id: Uuid,
    },
    ShipmentReceived {
        logistic_id: Uuid,
        shipment_id: String,
        institution_id: Uuid,
    },
    UsageLogged {
        institution_id: Uuid,
        medicine_id: Uuid,
        quantity: i32,
    },
}

/// Cloneable handle for emitting events. Sends never block business
/// transactions; a full channel drops the event with a log line.
#[derive(Clone)]
pub struct EventSender(mpsc::Sender<Event>);

impl EventSender {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self(tx)
    }

    pub async fn send(&self, event: Event) {
        if let Err(e) = self.0.try_send(event) {
            error!(error = %e, "event channel rejected event");
        }
    }
}

/// Central event loop. Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, notifier: NotificationService) {
    info!("event processor started");
    while let Some(event) = rx.recv().await {
        debug!(?event, "processing event");
        match &event {
            Event::RequirementDecided {
                requirement_id,
                institution_id,
                overall_status,
            } => {
                notifier
                    .notify(
                        &institution_id.to_string(),
                        "Requirement decision",
                        &format!("Requirement {requirement_id} is now {overall_status}"),
                    )
                    .await;
            }
            Event::ShipmentCreated {
                shipment_id,
                institution_id,
                ..
            } => {
                notifier
                    .notify(
                        &institution_id.to_string(),
                        "Shipment dispatched",
                        &format!("Shipment {shipment_id} is on its way"),
                    )
                    .await;
            }
            Event::ShipmentDelivered {
                shipment_id,
                institution_id,
                ..
            } => {
                notifier
                    .notify(
                        &institution_id.to_string(),
                        "Shipment delivered",
                        &format!("Shipment {shipment_id} has arrived"),
                    )
                    .await;
            }
            Event::ShipmentReceived {
                shipment_id,
                institution_id,
                ..
            } => {
                notifier
                    .notify(
                        &institution_id.to_string(),
                        "Shipment received",
                        &format!("Shipment {shipment_id} was booked into stock"),
                    )
                    .await;
            }
            _ => {}
        }
    }
    info!("event processor stopped");
}
