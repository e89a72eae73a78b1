use crate::{
    catalog::CatalogStore,
    errors::ServiceError,
    services::stock_store::StockStore,
};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Request-scoped cache of pooled sums, keyed by the distinct sorted id set.
///
/// Cleared on every stock row write; never trusted across a write boundary.
#[derive(Debug, Default)]
pub struct AvailabilityCache {
    sums: DashMap<Vec<i64>, i64>,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &[i64]) -> Option<i64> {
        self.sums.get(key).map(|v| *v)
    }

    fn insert(&self, key: Vec<i64>, sum: i64) {
        self.sums.insert(key, sum);
    }

    /// Invalidate-on-write contract: any stock row write clears the cache.
    pub fn clear(&self) {
        self.sums.clear();
    }
}

/// Computes customer-visible stock status from live stock rows, overriding
/// the catalog's native stock computation.
#[derive(Clone)]
pub struct AvailabilityAggregator {
    stock_store: StockStore,
    catalog: Arc<dyn CatalogStore>,
    cache: Arc<AvailabilityCache>,
}

impl AvailabilityAggregator {
    pub fn new(
        stock_store: StockStore,
        catalog: Arc<dyn CatalogStore>,
        cache: Arc<AvailabilityCache>,
    ) -> Self {
        Self {
            stock_store,
            catalog,
            cache,
        }
    }

    /// In-stock check for a single item. A parent with variant children is
    /// in stock when the children's pooled total is positive; a child (or a
    /// simple item) checks only its own id.
    #[instrument(skip(self))]
    pub async fn is_in_stock(&self, item_id: i64) -> Result<bool, ServiceError> {
        let children = self.catalog.child_item_ids(item_id).await?;
        let ids = if children.is_empty() {
            vec![item_id]
        } else {
            children
        };
        self.is_any_in_stock(&ids).await
    }

    /// Pooled in-stock check across an explicit id set.
    #[instrument(skip(self, item_ids))]
    pub async fn is_any_in_stock(&self, item_ids: &[i64]) -> Result<bool, ServiceError> {
        Ok(self.pooled_sum(item_ids).await? > 0)
    }

    /// Storefront-facing variant: any storage failure resolves to a
    /// conservative "no evidence of stock" instead of surfacing an error.
    pub async fn storefront_in_stock(&self, item_id: i64) -> bool {
        match self.is_in_stock(item_id).await {
            Ok(in_stock) => in_stock,
            Err(e) => {
                warn!(item_id, error = %e, "availability check failed, reporting out of stock");
                false
            }
        }
    }

    async fn pooled_sum(&self, item_ids: &[i64]) -> Result<i64, ServiceError> {
        let mut key: Vec<i64> = item_ids.to_vec();
        key.sort_unstable();
        key.dedup();

        if let Some(sum) = self.cache.get(&key) {
            return Ok(sum);
        }

        let sum = self.stock_store.sum_many(&key).await?;
        self.cache.insert(key, sum);
        Ok(sum)
    }
}
