use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Origin of a stock quantity change.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ChangeSource {
    #[sea_orm(string_value = "manual_admin")]
    ManualAdmin,
    #[sea_orm(string_value = "auto_migration")]
    AutoMigration,
    #[sea_orm(string_value = "order_fulfillment")]
    OrderFulfillment,
    #[sea_orm(string_value = "system_reconciliation")]
    SystemReconciliation,
}

/// Append-only audit record of a stock quantity change.
///
/// Rows are never updated or deleted after insertion, with one exception:
/// `location_name_text` starts empty and is frozen to the location's display
/// name at write time or when the location is permanently removed, so the
/// trail stays readable after the location row is gone.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: i64,
    pub location_id: i32,
    /// Denormalized display name, survives location deletion.
    pub location_name_text: String,
    /// Present when the change stems from a sale.
    pub order_id: Option<Uuid>,
    pub delta: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub source: ChangeSource,
    /// Actor identity (admin username, "system", ...).
    pub who: String,
    /// Free-form key/value context.
    #[sea_orm(column_type = "Json", nullable)]
    pub meta: Option<Json>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Ledger arithmetic invariant: after = before + delta.
    pub fn is_consistent(&self) -> bool {
        self.quantity_after == self.quantity_before + self.delta
    }
}
