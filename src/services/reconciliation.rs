use crate::{
    catalog::{meta_keys, CatalogStore, LocationDirectory, StockStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::availability::AvailabilityCache,
    services::stock_store::StockStore,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// What a reconcile pass computed and mirrored.
#[derive(Debug, Clone)]
pub struct ReconcileSummary {
    pub item_id: i64,
    /// Total across published locations, as mirrored onto the item.
    pub total: i64,
    /// Snapshot restricted to published locations, ascending location id.
    pub snapshot: BTreeMap<i32, i32>,
    /// Status written to the item; None when backorders govern display.
    pub status: Option<StockStatus>,
}

/// Recomputes an item's aggregate stock and snapshots from the stock store.
///
/// Always a full recompute, never an incremental patch, so it can be re-run
/// after any location change, migration or manual correction without drift.
/// Failures here propagate: an un-reconciled item can show wrong
/// availability to customers.
#[derive(Clone)]
pub struct ReconciliationEngine {
    stock_store: StockStore,
    catalog: Arc<dyn CatalogStore>,
    locations: Arc<dyn LocationDirectory>,
    availability_cache: Arc<AvailabilityCache>,
    event_sender: EventSender,
}

impl ReconciliationEngine {
    pub fn new(
        stock_store: StockStore,
        catalog: Arc<dyn CatalogStore>,
        locations: Arc<dyn LocationDirectory>,
        availability_cache: Arc<AvailabilityCache>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            stock_store,
            catalog,
            locations,
            availability_cache,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn reconcile(&self, item_id: i64) -> Result<ReconcileSummary, ServiceError> {
        let levels = self.stock_store.get_all(item_id).await?;

        // Quantity at an unpublished or draft location does not count toward
        // the visible total or the snapshot.
        let published: BTreeMap<i32, String> = self
            .locations
            .published()
            .await?
            .into_iter()
            .map(|l| (l.id, l.display_name))
            .collect();

        let snapshot: BTreeMap<i32, i32> = levels
            .iter()
            .filter(|(location_id, _)| published.contains_key(location_id))
            .map(|(location_id, level)| (*location_id, level.quantity))
            .collect();

        let total: i64 = snapshot.values().map(|q| *q as i64).sum();

        self.catalog.set_aggregate_quantity(item_id, total).await?;

        // Backorder-enabled items keep whatever status the catalog's own
        // backorder policy dictates.
        let status = if self.catalog.backorders_allowed(item_id).await? {
            None
        } else {
            let status = if total > 0 {
                StockStatus::InStock
            } else {
                StockStatus::OutOfStock
            };
            self.catalog.set_stock_status(item_id, status).await?;
            Some(status)
        };

        let by_id: Map<String, Value> = snapshot
            .iter()
            .map(|(id, qty)| (id.to_string(), Value::from(*qty)))
            .collect();
        let by_name: Map<String, Value> = snapshot
            .iter()
            .filter_map(|(id, qty)| {
                published
                    .get(id)
                    .map(|name| (name.clone(), Value::from(*qty)))
            })
            .collect();

        self.catalog
            .set_meta(item_id, meta_keys::STOCK_BY_LOCATION_ID, Value::Object(by_id))
            .await?;
        self.catalog
            .set_meta(
                item_id,
                meta_keys::STOCK_BY_LOCATION_NAME,
                Value::Object(by_name),
            )
            .await?;

        // Downstream sums depend on rows this pass may have observed moving
        self.availability_cache.clear();

        self.event_sender
            .send_best_effort(Event::ItemReconciled {
                item_id,
                total_quantity: total,
            })
            .await;

        info!(item_id, total, locations = snapshot.len(), "item reconciled");

        Ok(ReconcileSummary {
            item_id,
            total,
            snapshot,
            status,
        })
    }
}
