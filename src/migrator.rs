use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_stock_levels_table::Migration),
            Box::new(m20240101_000002_create_stock_ledger_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_stock_levels_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_stock_levels_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockLevels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLevels::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLevels::ItemId).big_integer().not_null())
                        .col(ColumnDef::new(StockLevels::LocationId).integer().not_null())
                        .col(
                            ColumnDef::new(StockLevels::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockLevels::LowStockThreshold).integer().null())
                        .col(ColumnDef::new(StockLevels::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            // One row per (item, location) pair; upsert semantics rely on this
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_levels_item_location")
                        .table(StockLevels::Table)
                        .col(StockLevels::ItemId)
                        .col(StockLevels::LocationId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_levels_location_id")
                        .table(StockLevels::Table)
                        .col(StockLevels::LocationId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLevels::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockLevels {
        Table,
        Id,
        ItemId,
        LocationId,
        Quantity,
        LowStockThreshold,
        UpdatedAt,
    }
}

mod m20240101_000002_create_stock_ledger_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_ledger_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockLedger::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StockLedger::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(StockLedger::ItemId).big_integer().not_null())
                        .col(ColumnDef::new(StockLedger::LocationId).integer().not_null())
                        .col(
                            ColumnDef::new(StockLedger::LocationNameText)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(StockLedger::OrderId).uuid().null())
                        .col(ColumnDef::new(StockLedger::Delta).integer().not_null())
                        .col(ColumnDef::new(StockLedger::QuantityBefore).integer().not_null())
                        .col(ColumnDef::new(StockLedger::QuantityAfter).integer().not_null())
                        .col(
                            ColumnDef::new(StockLedger::Source)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedger::Who).string().not_null())
                        .col(ColumnDef::new(StockLedger::Meta).json().null())
                        .col(
                            ColumnDef::new(StockLedger::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_item_id")
                        .table(StockLedger::Table)
                        .col(StockLedger::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_location_id")
                        .table(StockLedger::Table)
                        .col(StockLedger::LocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_created_at")
                        .table(StockLedger::Table)
                        .col(StockLedger::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLedger::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockLedger {
        Table,
        Id,
        ItemId,
        LocationId,
        LocationNameText,
        OrderId,
        Delta,
        QuantityBefore,
        QuantityAfter,
        Source,
        Who,
        Meta,
        CreatedAt,
    }
}
