#![allow(dead_code)]

use std::sync::Arc;

use stockledger::catalog::memory::{location, ItemRecord, MemoryCatalog};
use stockledger::catalog::{
    CatalogStore, LocationDirectory, LocationKind, PublicationState, ShippingMethodCatalog,
};
use stockledger::config::AppConfig;
use stockledger::db::{establish_connection, run_migrations};
use stockledger::events::{Event, EventSender};
use stockledger::StockSystem;
use tokio::sync::mpsc;

pub struct Harness {
    pub system: StockSystem,
    pub catalog: Arc<MemoryCatalog>,
    pub events: mpsc::Receiver<Event>,
}

/// Fresh system over an in-memory sqlite database and an in-memory catalog.
pub async fn harness() -> Harness {
    harness_with_config(AppConfig {
        rescan_debounce_ms: 10,
        auto_migrate: false,
        ..Default::default()
    })
    .await
}

pub async fn harness_with_config(config: AppConfig) -> Harness {
    // Distinct named in-memory database per harness so parallel tests in one
    // process never share state; shared cache keeps it visible pool-wide.
    static DB_SEQ: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let seq = DB_SEQ.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    let url = format!("sqlite:file:stockledger_test_{}?mode=memory&cache=shared", seq);

    let db = Arc::new(
        establish_connection(&url)
            .await
            .expect("Failed to create DB pool"),
    );
    run_migrations(db.as_ref())
        .await
        .expect("Failed to run migrations");

    let catalog = Arc::new(MemoryCatalog::new());
    let (event_sender, events) = EventSender::channel(64);

    let system = StockSystem::new(
        config,
        db,
        Arc::clone(&catalog) as Arc<dyn CatalogStore>,
        Arc::clone(&catalog) as Arc<dyn LocationDirectory>,
        Arc::clone(&catalog) as Arc<dyn ShippingMethodCatalog>,
        event_sender,
    );

    Harness {
        system,
        catalog,
        events,
    }
}

impl Harness {
    /// Registers a simple sellable item.
    pub fn add_item(&self, item_id: i64) {
        self.catalog.insert_item(item_id, ItemRecord::default());
    }

    /// Registers an item carrying a pre-migration legacy stock value.
    pub fn add_legacy_item(&self, item_id: i64, legacy_stock: i32) {
        self.catalog.insert_item(
            item_id,
            ItemRecord {
                legacy_stock: Some(legacy_stock),
                ..Default::default()
            },
        );
    }

    /// Registers a parent item with variant children (children added too).
    pub fn add_parent_item(&self, parent_id: i64, child_ids: &[i64]) {
        self.catalog.insert_item(
            parent_id,
            ItemRecord {
                child_ids: child_ids.to_vec(),
                ..Default::default()
            },
        );
        for child in child_ids {
            self.add_item(*child);
        }
    }

    pub fn add_store(&self, id: i32, name: &str) {
        self.catalog.insert_location(location(
            id,
            name,
            LocationKind::Store,
            PublicationState::Published,
            &[],
        ));
    }

    pub fn add_distribution_center(&self, id: i32, name: &str) {
        self.catalog.insert_location(location(
            id,
            name,
            LocationKind::DistributionCenter,
            PublicationState::Published,
            &[],
        ));
    }

    pub fn add_draft_location(&self, id: i32, name: &str, kind: LocationKind) {
        self.catalog
            .insert_location(location(id, name, kind, PublicationState::Draft, &[]));
    }
}
