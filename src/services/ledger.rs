use crate::{
    db::DbPool,
    entities::stock_ledger::{self, ChangeSource, Entity as StockLedger},
    errors::{ServiceError, SideEffect},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Input for one audit record.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub item_id: i64,
    pub location_id: i32,
    /// Display name at write time; empty when the caller could not resolve
    /// it (frozen later by the lifecycle handler).
    pub location_name_text: String,
    pub order_id: Option<Uuid>,
    pub delta: i32,
    pub quantity_before: i32,
    pub source: ChangeSource,
    pub who: String,
    pub meta: Option<serde_json::Value>,
}

/// Append-only forensic trail of stock changes.
///
/// Recording is layered on top of the stock mutation, never underneath it:
/// a failed insert is logged and reported as a [`SideEffect::Failed`], and
/// the mutation that triggered it completes regardless.
#[derive(Clone)]
pub struct AuditLedger {
    db_pool: Arc<DbPool>,
}

impl AuditLedger {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Appends one entry. Best-effort by contract.
    #[instrument(skip(self, entry), fields(item_id = entry.item_id, location_id = entry.location_id))]
    pub async fn record(&self, entry: NewLedgerEntry) -> SideEffect {
        let quantity_after = entry.quantity_before + entry.delta;

        let model = stock_ledger::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(entry.item_id),
            location_id: Set(entry.location_id),
            location_name_text: Set(entry.location_name_text),
            order_id: Set(entry.order_id),
            delta: Set(entry.delta),
            quantity_before: Set(entry.quantity_before),
            quantity_after: Set(quantity_after),
            source: Set(entry.source),
            who: Set(entry.who),
            meta: Set(entry.meta),
            created_at: Set(Utc::now()),
        };

        SideEffect::from_result(model.insert(self.db_pool.as_ref()).await, "ledger record")
    }

    /// Freezes a location's display name into every entry for that location
    /// that still has an empty `location_name_text`. Best-effort: a failure
    /// here must not block the location deletion it accompanies.
    #[instrument(skip(self))]
    pub async fn freeze_location_name(&self, location_id: i32, display_name: &str) -> SideEffect {
        let result = StockLedger::update_many()
            .col_expr(
                stock_ledger::Column::LocationNameText,
                sea_orm::sea_query::Expr::value(display_name),
            )
            .filter(stock_ledger::Column::LocationId.eq(location_id))
            .filter(stock_ledger::Column::LocationNameText.eq(""))
            .exec(self.db_pool.as_ref())
            .await;

        if let Ok(res) = &result {
            if res.rows_affected > 0 {
                info!(
                    location_id,
                    rows = res.rows_affected,
                    "froze display name into historical ledger rows"
                );
            }
        }

        SideEffect::from_result(result, "ledger name freeze")
    }

    /// Entries for an item, newest first. Read path for admin forensics.
    pub async fn entries_for_item(
        &self,
        item_id: i64,
    ) -> Result<Vec<stock_ledger::Model>, ServiceError> {
        StockLedger::find()
            .filter(stock_ledger::Column::ItemId.eq(item_id))
            .order_by_desc(stock_ledger::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Entries referencing a location, newest first.
    pub async fn entries_for_location(
        &self,
        location_id: i32,
    ) -> Result<Vec<stock_ledger::Model>, ServiceError> {
        StockLedger::find()
            .filter(stock_ledger::Column::LocationId.eq(location_id))
            .order_by_desc(stock_ledger::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}
