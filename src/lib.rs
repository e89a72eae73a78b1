//! stockledger
//!
//! Multi-location stock ledger and reconciliation engine: the canonical
//! per-location quantity store for catalog items, an append-only audit
//! ledger of every quantity change, full-recompute reconciliation that
//! mirrors aggregated stock back onto the catalog item, lazy migration of
//! legacy single-number stock, location lifecycle cascades, and the
//! fulfillment-routing resolver mapping shipping methods to locations.
//!
//! The catalog/content store that owns items and locations is an external
//! collaborator behind the traits in [`catalog`]; everything here operates
//! on its identifiers plus two relational tables of its own.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;

use crate::catalog::{CatalogStore, LocationDirectory, ShippingMethodCatalog};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::availability::{AvailabilityAggregator, AvailabilityCache};
use crate::services::fulfillment_routing::FulfillmentRouter;
use crate::services::ledger::AuditLedger;
use crate::services::legacy_migration::LegacyMigrationEngine;
use crate::services::location_lifecycle::{LocationLifecycleHandler, RescanScheduler};
use crate::services::reconciliation::ReconciliationEngine;
use crate::services::stock::StockService;
use crate::services::stock_store::StockStore;
use std::sync::Arc;
use std::time::Duration;

/// Everything wired once per process and passed by reference — no ambient
/// global lookup.
#[derive(Clone)]
pub struct StockSystem {
    pub config: AppConfig,
    pub db: Arc<DbPool>,
    pub event_sender: EventSender,
    pub stock_store: StockStore,
    pub ledger: AuditLedger,
    pub reconciliation: ReconciliationEngine,
    pub migration: LegacyMigrationEngine,
    pub router: FulfillmentRouter,
    pub availability: AvailabilityAggregator,
    pub availability_cache: Arc<AvailabilityCache>,
    pub lifecycle: Arc<LocationLifecycleHandler>,
    pub stock: StockService,
}

impl StockSystem {
    /// Constructs the full component graph against the given collaborators.
    pub fn new(
        config: AppConfig,
        db: Arc<DbPool>,
        catalog: Arc<dyn CatalogStore>,
        locations: Arc<dyn LocationDirectory>,
        shipping: Arc<dyn ShippingMethodCatalog>,
        event_sender: EventSender,
    ) -> Self {
        let stock_store = StockStore::new(Arc::clone(&db));
        let ledger = AuditLedger::new(Arc::clone(&db));
        let availability_cache = Arc::new(AvailabilityCache::new());

        let reconciliation = ReconciliationEngine::new(
            stock_store.clone(),
            Arc::clone(&catalog),
            Arc::clone(&locations),
            Arc::clone(&availability_cache),
            event_sender.clone(),
        );

        let migration = LegacyMigrationEngine::new(
            stock_store.clone(),
            ledger.clone(),
            Arc::clone(&catalog),
            Arc::clone(&locations),
            Arc::clone(&availability_cache),
            event_sender.clone(),
            config.default_migration_location_id,
        );

        let router = FulfillmentRouter::new(Arc::clone(&locations), shipping);

        let availability = AvailabilityAggregator::new(
            stock_store.clone(),
            Arc::clone(&catalog),
            Arc::clone(&availability_cache),
        );

        let rescan = RescanScheduler::new(
            event_sender.clone(),
            Duration::from_millis(config.rescan_debounce_ms),
        );

        let lifecycle = Arc::new(LocationLifecycleHandler::new(
            stock_store.clone(),
            ledger.clone(),
            reconciliation.clone(),
            Arc::clone(&locations),
            event_sender.clone(),
            rescan,
        ));

        let stock = StockService::new(
            stock_store.clone(),
            ledger.clone(),
            reconciliation.clone(),
            migration.clone(),
            router.clone(),
            availability.clone(),
            Arc::clone(&availability_cache),
            Arc::clone(&lifecycle),
            Arc::clone(&locations),
            event_sender.clone(),
            config.low_stock_threshold,
        );

        Self {
            config,
            db,
            event_sender,
            stock_store,
            ledger,
            reconciliation,
            migration,
            router,
            availability,
            availability_cache,
            lifecycle,
            stock,
        }
    }
}
