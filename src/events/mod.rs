use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the checkout and payment subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated {
        order_id: Uuid,
        customer_id: Uuid,
        product_id: Uuid,
        amount: Decimal,
    },
    OrderPaid(Uuid),
    OrderCancelled(Uuid),
    /// Poller gave up before the charge resolved; the order stays
    /// pending and needs operator attention or an out-of-band sweep.
    OrderPaymentUnresolved {
        order_id: Uuid,
        transaction_id: String,
    },
    UpsellAccepted(Uuid),

    // Customer events
    CustomerCreated(Uuid),
    CustomerUpdated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging instead of failing the caller when the
    /// processor has shut down.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to send event: {}", e);
        }
    }
}

/// Creates the event channel and its sender wrapper.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Consumes events for observability. Side effects stay in the services;
/// this task is the audit trail operators watch.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                order_id, amount, ..
            } => {
                info!(%order_id, %amount, "Order created");
            }
            Event::OrderPaid(order_id) => {
                info!(%order_id, "Order paid");
            }
            Event::OrderCancelled(order_id) => {
                info!(%order_id, "Order cancelled");
            }
            Event::OrderPaymentUnresolved {
                order_id,
                transaction_id,
            } => {
                warn!(%order_id, %transaction_id, "Payment watch timed out; order left pending");
            }
            Event::UpsellAccepted(order_id) => {
                info!(%order_id, "Upsell accepted");
            }
            Event::CustomerCreated(customer_id) => {
                info!(%customer_id, "Customer created");
            }
            Event::CustomerUpdated(customer_id) => {
                info!(%customer_id, "Customer contact details updated");
            }
        }
    }
    info!("Event processor stopped");
}
