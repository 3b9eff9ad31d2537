use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// Events emitted by the services after state changes. Consumed by a single
/// background task that writes them to the log; failures to deliver never
/// fail the triggering operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Category events
    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeactivated(Uuid),
    CategoryDeleted(Uuid),
    ProductsReassigned {
        target_category_id: Uuid,
        count: u64,
    },

    // Product events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    StockUpdated {
        product_id: Uuid,
        store_id: Uuid,
        quantity: i32,
    },

    // Store events
    StoreCreated(Uuid),
    StoreUpdated(Uuid),
    StoreDeleted(Uuid),

    // User events
    UserRegistered(Uuid),
    UserLoggedIn(Uuid),
    UserLoggedOut(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            error!(?event, "Failed to publish event: {}", e);
        }
    }
}

/// Create a connected sender/receiver pair with the given channel capacity.
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, writing each event to the structured log.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "Event processed");
    }
    info!("Event channel closed; event processor shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_does_not_fail_on_closed_channel() {
        let (sender, receiver) = event_channel(4);
        drop(receiver);
        // Must not panic or return an error path to the caller.
        sender.send_or_log(Event::CategoryCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_round_trip_through_channel() {
        let (sender, mut receiver) = event_channel(4);
        let id = Uuid::new_v4();
        sender.send(Event::ProductCreated(id)).await.unwrap();

        match receiver.recv().await {
            Some(Event::ProductCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
