use crate::{
    catalog::LocationDirectory,
    entities::stock_ledger::ChangeSource,
    errors::{ServiceError, SideEffect},
    events::{Event, EventSender},
    services::availability::{AvailabilityAggregator, AvailabilityCache},
    services::fulfillment_routing::FulfillmentRouter,
    services::ledger::{AuditLedger, NewLedgerEntry},
    services::legacy_migration::{LegacyMigrationEngine, MigrationOutcome},
    services::location_lifecycle::{LocationLifecycleHandler, LocationLifecycleObserver},
    services::reconciliation::{ReconcileSummary, ReconciliationEngine},
    services::stock_store::{LevelView, StockStore},
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// One requested per-location write.
#[derive(Debug, Clone, Copy)]
pub struct StockWrite {
    pub quantity: i32,
    pub low_stock_threshold: Option<i32>,
}

/// Per-location result of a save, including whether its audit record landed.
#[derive(Debug, Clone)]
pub struct LocationSaveResult {
    pub location_id: i32,
    pub previous_quantity: i32,
    pub quantity: i32,
    pub ledger: SideEffect,
}

/// Full result of `save_item_stock`.
#[derive(Debug, Clone)]
pub struct SaveStockResult {
    pub item_id: i64,
    pub migration: MigrationOutcome,
    pub locations: Vec<LocationSaveResult>,
    pub reconcile: ReconcileSummary,
}

/// Result of an order-fulfillment decrement.
#[derive(Debug, Clone)]
pub struct FulfillmentResult {
    pub item_id: i64,
    pub location_id: i32,
    pub previous_quantity: i32,
    pub quantity: i32,
    pub ledger: SideEffect,
    pub reconcile: ReconcileSummary,
}

/// A row at or below its effective low-stock threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowStockLevel {
    pub location_id: i32,
    pub quantity: i32,
    pub effective_threshold: i32,
}

/// The in-process surface exposed to admin and order-fulfillment callers.
#[derive(Clone)]
pub struct StockService {
    stock_store: StockStore,
    ledger: AuditLedger,
    reconciliation: ReconciliationEngine,
    migration: LegacyMigrationEngine,
    router: FulfillmentRouter,
    availability: AvailabilityAggregator,
    availability_cache: Arc<AvailabilityCache>,
    lifecycle: Arc<LocationLifecycleHandler>,
    locations: Arc<dyn LocationDirectory>,
    event_sender: EventSender,
    global_low_stock_threshold: i32,
}

impl StockService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stock_store: StockStore,
        ledger: AuditLedger,
        reconciliation: ReconciliationEngine,
        migration: LegacyMigrationEngine,
        router: FulfillmentRouter,
        availability: AvailabilityAggregator,
        availability_cache: Arc<AvailabilityCache>,
        lifecycle: Arc<LocationLifecycleHandler>,
        locations: Arc<dyn LocationDirectory>,
        event_sender: EventSender,
        global_low_stock_threshold: i32,
    ) -> Self {
        Self {
            stock_store,
            ledger,
            reconciliation,
            migration,
            router,
            availability,
            availability_cache,
            lifecycle,
            locations,
            event_sender,
            global_low_stock_threshold,
        }
    }

    /// Saves per-location quantities for an item.
    ///
    /// Order matters: the lazy legacy migration runs first (the item is
    /// about to be edited), then every upsert lands and is ledgered, then a
    /// single reconcile observes the fully-updated row set.
    #[instrument(skip(self, writes))]
    pub async fn save_item_stock(
        &self,
        item_id: i64,
        writes: BTreeMap<i32, StockWrite>,
        who: &str,
    ) -> Result<SaveStockResult, ServiceError> {
        let migration = self.migration.migrate_if_needed(item_id).await?;

        let mut locations = Vec::with_capacity(writes.len());
        for (location_id, write) in writes {
            let outcome = self
                .stock_store
                .upsert(item_id, location_id, write.quantity, write.low_stock_threshold)
                .await?;
            self.availability_cache.clear();

            let delta = outcome.row.quantity - outcome.previous_quantity;
            let ledger = if delta != 0 || outcome.created {
                self.ledger
                    .record(NewLedgerEntry {
                        item_id,
                        location_id,
                        location_name_text: self.display_name(location_id).await,
                        order_id: None,
                        delta,
                        quantity_before: outcome.previous_quantity,
                        source: ChangeSource::ManualAdmin,
                        who: who.to_string(),
                        meta: None,
                    })
                    .await
            } else {
                // Same values written twice: no semantic change to audit
                SideEffect::Applied
            };

            self.event_sender
                .send_best_effort(Event::StockUpserted {
                    item_id,
                    location_id,
                    previous_quantity: outcome.previous_quantity,
                    new_quantity: outcome.row.quantity,
                })
                .await;

            locations.push(LocationSaveResult {
                location_id,
                previous_quantity: outcome.previous_quantity,
                quantity: outcome.row.quantity,
                ledger,
            });
        }

        let reconcile = self.reconciliation.reconcile(item_id).await?;

        Ok(SaveStockResult {
            item_id,
            migration,
            locations,
            reconcile,
        })
    }

    /// Read path for admin rendering.
    pub async fn get_item_stock(
        &self,
        item_id: i64,
    ) -> Result<BTreeMap<i32, LevelView>, ServiceError> {
        self.stock_store.get_all(item_id).await
    }

    /// Decrements stock at the location fulfilling an order. The quantity on
    /// hand is clamped at zero; overselling shows up in the ledger delta,
    /// not as a negative row.
    #[instrument(skip(self))]
    pub async fn apply_order_fulfillment(
        &self,
        item_id: i64,
        location_id: i32,
        quantity: i32,
        order_id: Uuid,
        who: &str,
    ) -> Result<FulfillmentResult, ServiceError> {
        let previous = self
            .stock_store
            .get(item_id, location_id)
            .await?
            .map(|row| row.quantity)
            .unwrap_or(0);
        let new_quantity = (previous - quantity.max(0)).max(0);

        let outcome = self
            .stock_store
            .upsert(item_id, location_id, new_quantity, None)
            .await?;
        self.availability_cache.clear();

        let ledger = self
            .ledger
            .record(NewLedgerEntry {
                item_id,
                location_id,
                location_name_text: self.display_name(location_id).await,
                order_id: Some(order_id),
                delta: outcome.row.quantity - outcome.previous_quantity,
                quantity_before: outcome.previous_quantity,
                source: ChangeSource::OrderFulfillment,
                who: who.to_string(),
                meta: Some(json!({ "ordered_quantity": quantity })),
            })
            .await;

        self.event_sender
            .send_best_effort(Event::OrderStockFulfilled {
                item_id,
                location_id,
                order_id,
                quantity,
            })
            .await;

        let reconcile = self.reconciliation.reconcile(item_id).await?;

        Ok(FulfillmentResult {
            item_id,
            location_id,
            previous_quantity: outcome.previous_quantity,
            quantity: outcome.row.quantity,
            ledger,
            reconcile,
        })
    }

    /// Rows at or below their effective threshold (row threshold, else the
    /// configured global default).
    pub async fn low_stock_levels(&self, item_id: i64) -> Result<Vec<LowStockLevel>, ServiceError> {
        let levels = self.stock_store.get_all(item_id).await?;
        Ok(levels
            .into_iter()
            .filter_map(|(location_id, level)| {
                let effective = level
                    .low_stock_threshold
                    .unwrap_or(self.global_low_stock_threshold);
                (level.quantity <= effective).then_some(LowStockLevel {
                    location_id,
                    quantity: level.quantity,
                    effective_threshold: effective,
                })
            })
            .collect())
    }

    pub async fn resolve_fulfillment_location(
        &self,
        shipping_instance_id: &str,
    ) -> Result<Option<i32>, ServiceError> {
        self.router.resolve(shipping_instance_id).await
    }

    pub async fn is_in_stock(&self, item_id: i64) -> Result<bool, ServiceError> {
        self.availability.is_in_stock(item_id).await
    }

    pub async fn is_any_in_stock(&self, item_ids: &[i64]) -> Result<bool, ServiceError> {
        self.availability.is_any_in_stock(item_ids).await
    }

    pub async fn storefront_in_stock(&self, item_id: i64) -> bool {
        self.availability.storefront_in_stock(item_id).await
    }

    pub async fn reconcile(&self, item_id: i64) -> Result<ReconcileSummary, ServiceError> {
        self.reconciliation.reconcile(item_id).await
    }

    /// Lifecycle hook: permanent deletion of a location.
    pub async fn on_location_deleted(&self, location_id: i32) -> Result<Vec<i64>, ServiceError> {
        self.lifecycle.on_location_deleted(location_id).await
    }

    /// Lifecycle hook: any save of a location record.
    pub async fn on_location_saved(&self, location_id: i32) -> Result<(), ServiceError> {
        self.lifecycle.on_location_saved(location_id).await
    }

    async fn display_name(&self, location_id: i32) -> String {
        match self.locations.get(location_id).await {
            Ok(Some(location)) => location.display_name,
            // Unresolvable now; the lifecycle handler freezes it later
            _ => String::new(),
        }
    }
}
