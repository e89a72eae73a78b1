use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Canonical per-(item, location) stock record.
///
/// At most one row exists per pair (unique index); writes go through
/// upsert semantics in the stock store service.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_levels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub item_id: i64,
    pub location_id: i32,
    pub quantity: i32,
    /// NULL means "inherit the configured global default".
    pub low_stock_threshold: Option<i32>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
