use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Typed events emitted by the stock core.
///
/// Emission is an auxiliary effect of the primary write: subscribers get
/// best-effort delivery, and a full channel never aborts a stock mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockUpserted {
        item_id: i64,
        location_id: i32,
        previous_quantity: i32,
        new_quantity: i32,
    },
    ItemReconciled {
        item_id: i64,
        total_quantity: i64,
    },
    LocationStockDeleted {
        location_id: i32,
        affected_items: Vec<i64>,
    },
    LegacyStockMigrated {
        item_id: i64,
        location_id: i32,
        quantity: i32,
    },
    OrderStockFulfilled {
        item_id: i64,
        location_id: i32,
        order_id: Uuid,
        quantity: i32,
    },
    /// Request for a global rescan of location-dependent state.
    RescanRequested {
        reason: String,
        requested_at: DateTime<Utc>,
    },
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

    /// Creates a sender/receiver pair with the given channel capacity
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Best-effort send: a delivery failure is logged, never propagated.
    pub async fn send_best_effort(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping event, channel unavailable");
        }
    }
}

/// Trait for event subscribers processing events asynchronously.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

/// Drains the event channel and fans events out to the registered handlers.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Box<dyn EventHandler>>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        for handler in &handlers {
            if let Err(e) = handler.handle_event(event.clone()).await {
                warn!(error = %e, event = ?event, "event handler failed");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle_event(&self, _event: Event) -> Result<(), String> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn process_events_fans_out_to_handlers() {
        let (sender, rx) = EventSender::channel(8);
        let seen = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            seen: Arc::clone(&seen),
        };

        let loop_task = tokio::spawn(process_events(rx, vec![Box::new(handler)]));

        sender
            .send(Event::StockUpserted {
                item_id: 1,
                location_id: 10,
                previous_quantity: 0,
                new_quantity: 5,
            })
            .await
            .unwrap();
        sender
            .send(Event::ItemReconciled {
                item_id: 1,
                total_quantity: 5,
            })
            .await
            .unwrap();
        drop(sender);

        loop_task.await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn send_best_effort_swallows_closed_channel() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        // Must not panic or error out
        sender
            .send_best_effort(Event::RescanRequested {
                reason: "test".into(),
                requested_at: Utc::now(),
            })
            .await;
    }

    #[tokio::test]
    async fn events_round_trip_through_channel() {
        let (sender, mut rx) = EventSender::channel(4);
        sender
            .send(Event::ItemReconciled {
                item_id: 7,
                total_quantity: 12,
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::ItemReconciled {
                item_id,
                total_quantity,
            }) => {
                assert_eq!(item_id, 7);
                assert_eq!(total_quantity, 12);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
