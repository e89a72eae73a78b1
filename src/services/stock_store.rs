use crate::{
    db::DbPool,
    entities::stock_level::{self, Entity as StockLevel},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Per-location level as exposed to read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelView {
    pub quantity: i32,
    /// None means "inherit the configured global default".
    pub low_stock_threshold: Option<i32>,
}

/// Result of an upsert, carrying the prior quantity read immediately before
/// the write so the caller can ledger an accurate delta.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub row: stock_level::Model,
    pub previous_quantity: i32,
    pub created: bool,
}

/// Canonical store of per-(item, location) quantities.
///
/// Concurrent writes to the same pair are last-write-wins at the row level;
/// the read/compute/write used for delta accounting is deliberately not
/// wrapped in a transaction (see the crate docs on the accepted race window).
#[derive(Clone)]
pub struct StockStore {
    db_pool: Arc<DbPool>,
}

impl StockStore {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates or updates the row for (item, location).
    ///
    /// Negative quantities and thresholds are clamped to zero rather than
    /// rejected; admin input is expected to be messy. A write against an
    /// unknown pair is a creation, never an error.
    #[instrument(skip(self))]
    pub async fn upsert(
        &self,
        item_id: i64,
        location_id: i32,
        quantity: i32,
        low_stock_threshold: Option<i32>,
    ) -> Result<UpsertOutcome, ServiceError> {
        let db = self.db_pool.as_ref();
        let quantity = quantity.max(0);
        let low_stock_threshold = low_stock_threshold.map(|t| t.max(0));

        let existing = StockLevel::find()
            .filter(stock_level::Column::ItemId.eq(item_id))
            .filter(stock_level::Column::LocationId.eq(location_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;

        match existing {
            Some(row) => {
                let previous_quantity = row.quantity;
                let mut active: stock_level::ActiveModel = row.into();
                active.quantity = Set(quantity);
                active.low_stock_threshold = Set(low_stock_threshold);
                active.updated_at = Set(Utc::now().into());

                let updated = active.update(db).await.map_err(ServiceError::db_error)?;
                debug!(
                    item_id,
                    location_id, previous_quantity, quantity, "stock level updated"
                );

                Ok(UpsertOutcome {
                    row: updated,
                    previous_quantity,
                    created: false,
                })
            }
            None => {
                let new_row = stock_level::ActiveModel {
                    item_id: Set(item_id),
                    location_id: Set(location_id),
                    quantity: Set(quantity),
                    low_stock_threshold: Set(low_stock_threshold),
                    updated_at: Set(Utc::now().into()),
                    ..Default::default()
                };

                let inserted = new_row.insert(db).await.map_err(ServiceError::db_error)?;
                debug!(item_id, location_id, quantity, "stock level created");

                Ok(UpsertOutcome {
                    row: inserted,
                    previous_quantity: 0,
                    created: true,
                })
            }
        }
    }

    /// All levels for an item, keyed by location id (ascending for
    /// deterministic display).
    #[instrument(skip(self))]
    pub async fn get_all(&self, item_id: i64) -> Result<BTreeMap<i32, LevelView>, ServiceError> {
        let rows = StockLevel::find()
            .filter(stock_level::Column::ItemId.eq(item_id))
            .order_by_asc(stock_level::Column::LocationId)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.location_id,
                    LevelView {
                        quantity: row.quantity,
                        low_stock_threshold: row.low_stock_threshold,
                    },
                )
            })
            .collect())
    }

    /// Raw rows for an item, ascending location id.
    pub async fn rows_for_item(
        &self,
        item_id: i64,
    ) -> Result<Vec<stock_level::Model>, ServiceError> {
        StockLevel::find()
            .filter(stock_level::Column::ItemId.eq(item_id))
            .order_by_asc(stock_level::Column::LocationId)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Row for a single pair, if present.
    pub async fn get(
        &self,
        item_id: i64,
        location_id: i32,
    ) -> Result<Option<stock_level::Model>, ServiceError> {
        StockLevel::find()
            .filter(stock_level::Column::ItemId.eq(item_id))
            .filter(stock_level::Column::LocationId.eq(location_id))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Removes every row at a location and returns the affected item ids so
    /// the caller can reconcile them. Lifecycle use only.
    #[instrument(skip(self))]
    pub async fn delete_all_for_location(
        &self,
        location_id: i32,
    ) -> Result<Vec<i64>, ServiceError> {
        let db = self.db_pool.as_ref();

        let rows = StockLevel::find()
            .filter(stock_level::Column::LocationId.eq(location_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut affected: Vec<i64> = rows.iter().map(|r| r.item_id).collect();
        affected.sort_unstable();
        affected.dedup();

        if !rows.is_empty() {
            StockLevel::delete_many()
                .filter(stock_level::Column::LocationId.eq(location_id))
                .exec(db)
                .await
                .map_err(ServiceError::db_error)?;
            info!(
                location_id,
                affected = affected.len(),
                "deleted stock rows for removed location"
            );
        }

        Ok(affected)
    }

    /// Total quantity across all locations; absent rows contribute 0.
    #[instrument(skip(self))]
    pub async fn sum(&self, item_id: i64) -> Result<i64, ServiceError> {
        let rows = StockLevel::find()
            .filter(stock_level::Column::ItemId.eq(item_id))
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows.iter().map(|r| r.quantity as i64).sum())
    }

    /// Combined total across several item ids (parent/variant pooling).
    #[instrument(skip(self, item_ids))]
    pub async fn sum_many(&self, item_ids: &[i64]) -> Result<i64, ServiceError> {
        if item_ids.is_empty() {
            return Ok(0);
        }

        let rows = StockLevel::find()
            .filter(stock_level::Column::ItemId.is_in(item_ids.to_vec()))
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows.iter().map(|r| r.quantity as i64).sum())
    }
}
