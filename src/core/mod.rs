//! Core business logic, independent of any front end.

/// Time source for time-dependent rules
pub mod clock;
/// Low-stock and order lifecycle notifications
pub mod events;
/// Stock movements, inventories and ledger reconciliation
pub mod inventory;
/// Append-only stock movement ledger
pub mod ledger;
/// Order lifecycle and line items
pub mod order;
/// VAT rates and order totals
pub mod pricing;
/// Product catalog
pub mod product;
/// Table reservations
pub mod reservation;
/// Catalog seeding from configuration
pub mod seed;
/// Dining table status coordination
pub mod table;
