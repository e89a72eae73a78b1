//! External collaborator seams.
//!
//! The catalog/content store owns items and locations; this core only keys
//! on their identifiers. Everything consumed from it sits behind these
//! traits so the engine can run against a CMS adapter in production and the
//! in-memory implementation in tests and embedded use.

pub mod memory;

use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Item metadata keys owned by this crate.
pub mod meta_keys {
    /// Snapshot map: location id -> quantity (published locations only).
    pub const STOCK_BY_LOCATION_ID: &str = "stock_by_location_id";
    /// Snapshot map: location display name -> quantity.
    pub const STOCK_BY_LOCATION_NAME: &str = "stock_by_location_name";
    /// Set exactly once when legacy single-number stock has been migrated.
    pub const LEGACY_STOCK_MIGRATED: &str = "legacy_stock_migrated";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationKind {
    /// Customer-facing store, eligible for local pickup.
    Store,
    /// Ship-from warehouse.
    DistributionCenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationState {
    Draft,
    Published,
}

/// A location record as read from the external location store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: i32,
    pub display_name: String,
    pub kind: LocationKind,
    pub state: PublicationState,
    /// Shipping-method instance ids bound to this location.
    pub shipping_instance_ids: Vec<String>,
}

impl LocationRecord {
    pub fn is_published(&self) -> bool {
        self.state == PublicationState::Published
    }
}

/// One enabled-or-not shipping-method instance within a zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingInstance {
    pub instance_id: String,
    /// Plain method kind string, e.g. "local-pickup" or a carrier slug.
    pub method_kind: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

/// Item-side surface of the catalog store.
///
/// Writes against an unknown item are no-ops, not errors (referential gaps
/// self-correct on the next lifecycle pass).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Mirrors the reconciled total onto the item's aggregate quantity field.
    async fn set_aggregate_quantity(&self, item_id: i64, quantity: i64)
        -> Result<(), ServiceError>;

    async fn set_stock_status(&self, item_id: i64, status: StockStatus)
        -> Result<(), ServiceError>;

    async fn backorders_allowed(&self, item_id: i64) -> Result<bool, ServiceError>;

    /// Pre-migration single-number stock value, if the item still carries one.
    async fn legacy_stock(&self, item_id: i64) -> Result<Option<i32>, ServiceError>;

    async fn get_meta(&self, item_id: i64, key: &str) -> Result<Option<Value>, ServiceError>;

    async fn set_meta(&self, item_id: i64, key: &str, value: Value) -> Result<(), ServiceError>;

    /// Child variant ids of a parent item; empty for simple items.
    async fn child_item_ids(&self, item_id: i64) -> Result<Vec<i64>, ServiceError>;
}

/// Location-side surface of the catalog store.
#[async_trait]
pub trait LocationDirectory: Send + Sync {
    async fn get(&self, location_id: i32) -> Result<Option<LocationRecord>, ServiceError>;

    /// Every location regardless of publication state, ascending id.
    async fn all(&self) -> Result<Vec<LocationRecord>, ServiceError>;

    /// Published locations only, ascending id.
    async fn published(&self) -> Result<Vec<LocationRecord>, ServiceError>;
}

/// Read-only view of the shipping-zone/method catalog.
#[async_trait]
pub trait ShippingMethodCatalog: Send + Sync {
    /// All shipping-method instances across all zones.
    async fn instances(&self) -> Result<Vec<ShippingInstance>, ServiceError>;
}
