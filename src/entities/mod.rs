pub mod stock_ledger;
pub mod stock_level;
