//! In-memory catalog backing tests and embedded use, mirroring the contract
//! a CMS adapter implements in production.

use super::{
    CatalogStore, LocationDirectory, LocationKind, LocationRecord, PublicationState,
    ServiceError, ShippingInstance, ShippingMethodCatalog, StockStatus,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct ItemRecord {
    pub aggregate_quantity: i64,
    pub status: Option<StockStatus>,
    pub backorders_allowed: bool,
    pub legacy_stock: Option<i32>,
    pub meta: HashMap<String, Value>,
    pub child_ids: Vec<i64>,
}

/// Shared in-memory implementation of all three collaborator traits.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    items: RwLock<HashMap<i64, ItemRecord>>,
    locations: RwLock<BTreeMap<i32, LocationRecord>>,
    shipping: RwLock<Vec<ShippingInstance>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_item(&self, item_id: i64, record: ItemRecord) {
        self.items.write().unwrap().insert(item_id, record);
    }

    pub fn insert_location(&self, record: LocationRecord) {
        self.locations.write().unwrap().insert(record.id, record);
    }

    pub fn insert_shipping_instance(&self, instance: ShippingInstance) {
        self.shipping.write().unwrap().push(instance);
    }

    pub fn remove_location(&self, location_id: i32) -> Option<LocationRecord> {
        self.locations.write().unwrap().remove(&location_id)
    }

    pub fn set_publication(&self, location_id: i32, state: PublicationState) {
        if let Some(loc) = self.locations.write().unwrap().get_mut(&location_id) {
            loc.state = state;
        }
    }

    // Read-back helpers for assertions and admin rendering

    pub fn item(&self, item_id: i64) -> Option<ItemRecord> {
        self.items.read().unwrap().get(&item_id).cloned()
    }

    pub fn aggregate_quantity(&self, item_id: i64) -> Option<i64> {
        self.item(item_id).map(|i| i.aggregate_quantity)
    }

    pub fn stock_status(&self, item_id: i64) -> Option<StockStatus> {
        self.item(item_id).and_then(|i| i.status)
    }

    pub fn meta(&self, item_id: i64, key: &str) -> Option<Value> {
        self.item(item_id).and_then(|i| i.meta.get(key).cloned())
    }
}

/// Convenience constructor for a simple location record.
pub fn location(
    id: i32,
    display_name: &str,
    kind: LocationKind,
    state: PublicationState,
    shipping_instance_ids: &[&str],
) -> LocationRecord {
    LocationRecord {
        id,
        display_name: display_name.to_string(),
        kind,
        state,
        shipping_instance_ids: shipping_instance_ids.iter().map(|s| s.to_string()).collect(),
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn set_aggregate_quantity(
        &self,
        item_id: i64,
        quantity: i64,
    ) -> Result<(), ServiceError> {
        // Unknown item: no-op by contract
        if let Some(item) = self.items.write().unwrap().get_mut(&item_id) {
            item.aggregate_quantity = quantity;
        }
        Ok(())
    }

    async fn set_stock_status(
        &self,
        item_id: i64,
        status: StockStatus,
    ) -> Result<(), ServiceError> {
        if let Some(item) = self.items.write().unwrap().get_mut(&item_id) {
            item.status = Some(status);
        }
        Ok(())
    }

    async fn backorders_allowed(&self, item_id: i64) -> Result<bool, ServiceError> {
        Ok(self
            .items
            .read()
            .unwrap()
            .get(&item_id)
            .map(|i| i.backorders_allowed)
            .unwrap_or(false))
    }

    async fn legacy_stock(&self, item_id: i64) -> Result<Option<i32>, ServiceError> {
        Ok(self
            .items
            .read()
            .unwrap()
            .get(&item_id)
            .and_then(|i| i.legacy_stock))
    }

    async fn get_meta(&self, item_id: i64, key: &str) -> Result<Option<Value>, ServiceError> {
        Ok(self
            .items
            .read()
            .unwrap()
            .get(&item_id)
            .and_then(|i| i.meta.get(key).cloned()))
    }

    async fn set_meta(&self, item_id: i64, key: &str, value: Value) -> Result<(), ServiceError> {
        if let Some(item) = self.items.write().unwrap().get_mut(&item_id) {
            item.meta.insert(key.to_string(), value);
        }
        Ok(())
    }

    async fn child_item_ids(&self, item_id: i64) -> Result<Vec<i64>, ServiceError> {
        Ok(self
            .items
            .read()
            .unwrap()
            .get(&item_id)
            .map(|i| i.child_ids.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl LocationDirectory for MemoryCatalog {
    async fn get(&self, location_id: i32) -> Result<Option<LocationRecord>, ServiceError> {
        Ok(self.locations.read().unwrap().get(&location_id).cloned())
    }

    async fn all(&self) -> Result<Vec<LocationRecord>, ServiceError> {
        // BTreeMap iteration gives ascending id order
        Ok(self.locations.read().unwrap().values().cloned().collect())
    }

    async fn published(&self) -> Result<Vec<LocationRecord>, ServiceError> {
        Ok(self
            .locations
            .read()
            .unwrap()
            .values()
            .filter(|l| l.is_published())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ShippingMethodCatalog for MemoryCatalog {
    async fn instances(&self) -> Result<Vec<ShippingInstance>, ServiceError> {
        Ok(self.shipping.read().unwrap().clone())
    }
}
