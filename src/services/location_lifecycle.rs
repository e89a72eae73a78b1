use crate::{
    catalog::LocationDirectory,
    errors::ServiceError,
    events::{Event, EventSender},
    services::ledger::AuditLedger,
    services::reconciliation::ReconciliationEngine,
    services::stock_store::StockStore,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Explicit registration seam for location lifecycle notifications from the
/// external location-record collaborator.
#[async_trait]
pub trait LocationLifecycleObserver: Send + Sync {
    /// Permanent deletion. Returns the item ids whose stock was affected.
    async fn on_location_deleted(&self, location_id: i32) -> Result<Vec<i64>, ServiceError>;

    /// Any save of a location record, including draft→published transitions.
    async fn on_location_saved(&self, location_id: i32) -> Result<(), ServiceError>;
}

/// Debounced, coalescing scheduler for global rescans.
///
/// Rapid repeated saves collapse into one `RescanRequested` event: each
/// request bumps a generation counter and only the task holding the latest
/// generation fires after the delay. Fire-and-forget and idempotent — a
/// rescan that runs twice is safe, one that never runs is corrected by the
/// next trigger.
#[derive(Clone)]
pub struct RescanScheduler {
    event_sender: EventSender,
    debounce: Duration,
    generation: Arc<AtomicU64>,
}

impl RescanScheduler {
    pub fn new(event_sender: EventSender, debounce: Duration) -> Self {
        Self {
            event_sender,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedules a rescan after the debounce window, superseding any pending
    /// request.
    pub fn schedule(&self, reason: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sender = self.event_sender.clone();
        let counter = Arc::clone(&self.generation);
        let debounce = self.debounce;
        let reason = reason.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if counter.load(Ordering::SeqCst) == generation {
                sender
                    .send_best_effort(Event::RescanRequested {
                        reason,
                        requested_at: Utc::now(),
                    })
                    .await;
            }
        });
    }

    /// Synchronous fallback: emit the rescan request immediately.
    pub async fn run_now(&self, reason: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.event_sender
            .send_best_effort(Event::RescanRequested {
                reason: reason.to_string(),
                requested_at: Utc::now(),
            })
            .await;
    }
}

/// Reacts to location creation/publication/deletion.
#[derive(Clone)]
pub struct LocationLifecycleHandler {
    stock_store: StockStore,
    ledger: AuditLedger,
    reconciliation: ReconciliationEngine,
    locations: Arc<dyn LocationDirectory>,
    event_sender: EventSender,
    rescan: RescanScheduler,
}

impl LocationLifecycleHandler {
    pub fn new(
        stock_store: StockStore,
        ledger: AuditLedger,
        reconciliation: ReconciliationEngine,
        locations: Arc<dyn LocationDirectory>,
        event_sender: EventSender,
        rescan: RescanScheduler,
    ) -> Self {
        Self {
            stock_store,
            ledger,
            reconciliation,
            locations,
            event_sender,
            rescan,
        }
    }

    pub fn rescan_scheduler(&self) -> &RescanScheduler {
        &self.rescan
    }
}

#[async_trait]
impl LocationLifecycleObserver for LocationLifecycleHandler {
    #[instrument(skip(self))]
    async fn on_location_deleted(&self, location_id: i32) -> Result<Vec<i64>, ServiceError> {
        // Freeze history first, while the display name is still resolvable.
        // Best-effort: a failure here never blocks the deletion cascade.
        match self.locations.get(location_id).await {
            Ok(Some(location)) => {
                self.ledger
                    .freeze_location_name(location_id, &location.display_name)
                    .await;
            }
            Ok(None) => {
                warn!(
                    location_id,
                    "location already gone from directory, ledger names stay as written"
                );
            }
            Err(e) => {
                warn!(location_id, error = %e, "could not resolve location for name freeze");
            }
        }

        let affected = self.stock_store.delete_all_for_location(location_id).await?;

        // Reconcile errors propagate: leaving an item un-reconciled after its
        // rows vanished would show stale stock to customers.
        for item_id in &affected {
            self.reconciliation.reconcile(*item_id).await?;
        }

        self.event_sender
            .send_best_effort(Event::LocationStockDeleted {
                location_id,
                affected_items: affected.clone(),
            })
            .await;

        self.rescan.schedule("location deleted");

        info!(
            location_id,
            affected = affected.len(),
            "location deletion cascade complete"
        );

        Ok(affected)
    }

    #[instrument(skip(self))]
    async fn on_location_saved(&self, location_id: i32) -> Result<(), ServiceError> {
        self.rescan.schedule("location saved");
        Ok(())
    }
}
