//! Service wiring.
//!
//! [`Engine`] builds every service over one database connection, one notifier and
//! one clock, and hands each its collaborators explicitly.

use crate::core::{
    clock::{Clock, SystemClock},
    events::Notifier,
    inventory::InventoryService,
    order::OrderService,
    pricing::TaxRates,
    reservation::ReservationBook,
    table::TableCoordinator,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// The assembled inventory and order engine.
#[derive(Clone)]
pub struct Engine {
    /// Stock movements and inventories
    pub inventory: InventoryService,
    /// Orders and their items
    pub orders: OrderService,
    /// Dining tables
    pub tables: TableCoordinator,
    /// Reservations
    pub reservations: ReservationBook,
    /// Listener registry shared by the services
    pub notifier: Arc<Notifier>,
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Builds an engine reading time from the system clock.
    #[must_use]
    pub fn new(db: DatabaseConnection, tax_rates: TaxRates) -> Self {
        Self::with_clock(db, tax_rates, Arc::new(SystemClock))
    }

    /// Builds an engine with an explicit time source.
    #[must_use]
    pub fn with_clock(db: DatabaseConnection, tax_rates: TaxRates, clock: Arc<dyn Clock>) -> Self {
        let notifier = Arc::new(Notifier::new());
        let tables = TableCoordinator::new(db.clone(), Arc::clone(&clock));
        let inventory = InventoryService::new(db.clone(), Arc::clone(&notifier), Arc::clone(&clock));
        let orders = OrderService::new(
            db.clone(),
            inventory.clone(),
            tables.clone(),
            tax_rates,
            Arc::clone(&notifier),
            Arc::clone(&clock),
        );
        let reservations = ReservationBook::new(db.clone(), tables.clone(), Arc::clone(&clock));

        Self {
            inventory,
            orders,
            tables,
            reservations,
            notifier,
            db,
            clock,
        }
    }

    /// The underlying connection, for catalog queries.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Current time as seen by every service.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
