use crate::{
    catalog::{meta_keys, CatalogStore, LocationDirectory, LocationKind},
    entities::stock_ledger::ChangeSource,
    errors::ServiceError,
    events::{Event, EventSender},
    services::availability::AvailabilityCache,
    services::ledger::{AuditLedger, NewLedgerEntry},
    services::stock_store::StockStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

/// Why a migration pass did (or did not) move stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Flag already set; the item was migrated by an earlier pass.
    AlreadyMigrated,
    /// No legacy value, or a legacy value of zero or less.
    NothingToMigrate,
    /// No configured default and no published distribution center; retried
    /// on the next edit attempt.
    Deferred,
    /// A stock row already exists at the default location; crediting again
    /// would double-count.
    AlreadyStocked { location_id: i32 },
    Migrated { location_id: i32, quantity: i32 },
}

/// Moves a pre-migration single-number stock value into the stock store,
/// at most once per item. Fired lazily when an item is about to be edited,
/// never as a batch job.
#[derive(Clone)]
pub struct LegacyMigrationEngine {
    stock_store: StockStore,
    ledger: AuditLedger,
    catalog: Arc<dyn CatalogStore>,
    locations: Arc<dyn LocationDirectory>,
    availability_cache: Arc<AvailabilityCache>,
    event_sender: EventSender,
    default_location_id: Option<i32>,
}

impl LegacyMigrationEngine {
    pub fn new(
        stock_store: StockStore,
        ledger: AuditLedger,
        catalog: Arc<dyn CatalogStore>,
        locations: Arc<dyn LocationDirectory>,
        availability_cache: Arc<AvailabilityCache>,
        event_sender: EventSender,
        default_location_id: Option<i32>,
    ) -> Self {
        Self {
            stock_store,
            ledger,
            catalog,
            locations,
            availability_cache,
            event_sender,
            default_location_id,
        }
    }

    #[instrument(skip(self))]
    pub async fn migrate_if_needed(&self, item_id: i64) -> Result<MigrationOutcome, ServiceError> {
        // The flag, not current totals, enforces at-most-once: re-deriving
        // from totals would re-credit stock already partially consumed.
        if let Some(Value::Bool(true)) = self
            .catalog
            .get_meta(item_id, meta_keys::LEGACY_STOCK_MIGRATED)
            .await?
        {
            return Ok(MigrationOutcome::AlreadyMigrated);
        }

        let legacy = self.catalog.legacy_stock(item_id).await?;
        let quantity = match legacy {
            Some(q) if q > 0 => q,
            _ => return Ok(MigrationOutcome::NothingToMigrate),
        };

        let location_id = match self.resolve_default_location().await? {
            Some(id) => id,
            None => return Ok(MigrationOutcome::Deferred),
        };

        if self.stock_store.get(item_id, location_id).await?.is_some() {
            return Ok(MigrationOutcome::AlreadyStocked { location_id });
        }

        self.stock_store
            .upsert(item_id, location_id, quantity, None)
            .await?;
        self.availability_cache.clear();
        self.catalog
            .set_meta(item_id, meta_keys::LEGACY_STOCK_MIGRATED, Value::Bool(true))
            .await?;

        let location_name = self
            .locations
            .get(location_id)
            .await?
            .map(|l| l.display_name)
            .unwrap_or_default();

        self.ledger
            .record(NewLedgerEntry {
                item_id,
                location_id,
                location_name_text: location_name,
                order_id: None,
                delta: quantity,
                quantity_before: 0,
                source: ChangeSource::AutoMigration,
                who: "system".to_string(),
                meta: Some(json!({ "reason": "legacy stock migration" })),
            })
            .await;

        self.event_sender
            .send_best_effort(Event::LegacyStockMigrated {
                item_id,
                location_id,
                quantity,
            })
            .await;

        info!(item_id, location_id, quantity, "legacy stock migrated");

        Ok(MigrationOutcome::Migrated {
            location_id,
            quantity,
        })
    }

    /// Configured default first, else the first published
    /// distribution-center-type location (ascending id).
    async fn resolve_default_location(&self) -> Result<Option<i32>, ServiceError> {
        if let Some(id) = self.default_location_id {
            if self.locations.get(id).await?.is_some() {
                return Ok(Some(id));
            }
        }

        Ok(self
            .locations
            .published()
            .await?
            .into_iter()
            .find(|l| l.kind == LocationKind::DistributionCenter)
            .map(|l| l.id))
    }
}
