use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after a transaction commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderUpdated(Uuid),
    OrderFinalized(Uuid),
    OrderCancelled(Uuid),
    OrderDeleted(Uuid),
    OrderScanned {
        order_id: Uuid,
        variant_id: Uuid,
        quantity_added: i32,
    },
    StockReleased {
        variant_id: Uuid,
        quantity: i32,
    },
    ProductCreatedFromScan {
        product_id: Uuid,
        variant_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing the caller when the
    /// receiver is gone. Events are best-effort notifications.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!(?event, "Dropping event: {}", e);
        }
    }
}

/// Consumes events off the channel and logs them. The channel keeps domain
/// notifications off the request path; downstream consumers (webhooks,
/// projections) would hang off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(order_id) => info!(%order_id, "order created"),
            Event::OrderUpdated(order_id) => info!(%order_id, "order updated"),
            Event::OrderFinalized(order_id) => info!(%order_id, "order finalized"),
            Event::OrderCancelled(order_id) => info!(%order_id, "order cancelled"),
            Event::OrderDeleted(order_id) => info!(%order_id, "order deleted"),
            Event::OrderScanned {
                order_id,
                variant_id,
                quantity_added,
            } => info!(%order_id, %variant_id, quantity_added, "scan merged into order"),
            Event::StockReleased {
                variant_id,
                quantity,
            } => info!(%variant_id, quantity, "stock released"),
            Event::ProductCreatedFromScan {
                product_id,
                variant_id,
            } => info!(%product_id, %variant_id, "product created from scan"),
        }
    }

    info!("Event processing loop stopped");
}
