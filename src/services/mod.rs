// Canonical store and audit trail
pub mod ledger;
pub mod stock_store;

// Derived state
pub mod availability;
pub mod reconciliation;

// Edge triggers
pub mod legacy_migration;
pub mod location_lifecycle;

// Routing
pub mod fulfillment_routing;

// Exposed facade
pub mod stock;
