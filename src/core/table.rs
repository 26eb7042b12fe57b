//! Table status coordinator.
//!
//! A table's `status` column is a cache. [`TableCoordinator::refresh_table_status`]
//! recomputes it from the table's reservations and open orders; an active
//! reservation always wins over order-derived occupancy.

use crate::{
    core::clock::Clock,
    entities::{
        DiningTable, Order, Reservation, dining_table,
        dining_table::TableStatus,
        order::{self, OrderStatus},
        reservation::{self, ReservationStatus},
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Decides a table's status from what currently involves it.
#[must_use]
pub const fn derive_status(has_active_reservation: bool, has_open_order: bool) -> TableStatus {
    if has_active_reservation {
        TableStatus::Reserved
    } else if has_open_order {
        TableStatus::Occupied
    } else {
        TableStatus::Available
    }
}

/// Keeps dining table statuses consistent with orders and reservations.
#[derive(Clone)]
pub struct TableCoordinator {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl TableCoordinator {
    /// Creates a coordinator reading time from `clock`.
    #[must_use]
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Adds a dining table. Numbers are unique.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for a non-positive number or capacity, or a
    /// number already in use.
    #[instrument(skip(self))]
    pub async fn create_table(&self, number: i32, capacity: i32) -> Result<dining_table::Model> {
        if number <= 0 {
            return Err(Error::validation(format!(
                "Table number must be positive, got {number}"
            )));
        }
        if capacity <= 0 {
            return Err(Error::validation(format!(
                "Table capacity must be positive, got {capacity}"
            )));
        }
        if self.get_table_by_number(number).await?.is_some() {
            return Err(Error::validation(format!("Table {number} already exists")));
        }

        let table = dining_table::ActiveModel {
            number: Set(number),
            capacity: Set(capacity),
            status: Set(TableStatus::Available),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(number, capacity, "Table created");
        Ok(table)
    }

    /// Finds a table by number.
    pub async fn get_table_by_number(&self, number: i32) -> Result<Option<dining_table::Model>> {
        DiningTable::find()
            .filter(dining_table::Column::Number.eq(number))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Finds a table by number, failing with [`Error::TableNotFound`].
    pub async fn require_table(&self, number: i32) -> Result<dining_table::Model> {
        self.get_table_by_number(number)
            .await?
            .ok_or(Error::TableNotFound { number })
    }

    /// All tables ordered by number.
    pub async fn get_all_tables(&self) -> Result<Vec<dining_table::Model>> {
        DiningTable::find()
            .order_by_asc(dining_table::Column::Number)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Recomputes and stores a table's status, returning it.
    ///
    /// `reserved` if a confirmed or seated reservation covers now, else `occupied`
    /// if the table has a pending or in-progress order, else `available`.
    #[instrument(skip(self))]
    pub async fn refresh_table_status(&self, number: i32) -> Result<TableStatus> {
        let table = self.require_table(number).await?;
        let now = self.clock.now();

        let has_active_reservation = Reservation::find()
            .filter(reservation::Column::TableNumber.eq(number))
            .filter(
                reservation::Column::Status
                    .is_in([ReservationStatus::Confirmed, ReservationStatus::Seated]),
            )
            .all(&self.db)
            .await?
            .iter()
            .any(|booking| booking.is_active_at(now));

        let open_orders = Order::find()
            .filter(order::Column::TableNumber.eq(number))
            .filter(order::Column::Status.is_in(OrderStatus::OPEN))
            .count(&self.db)
            .await?;

        let status = derive_status(has_active_reservation, open_orders > 0);
        if status != table.status {
            debug!(number, from = %table.status, to = %status, "Table status changed");
            let mut table: dining_table::ActiveModel = table.into();
            table.status = Set(status);
            table.update(&self.db).await?;
        }

        Ok(status)
    }

    /// Reconciles every table, returning `(number, status)` pairs.
    pub async fn refresh_all_tables(&self) -> Result<Vec<(i32, TableStatus)>> {
        let mut statuses = Vec::new();
        for table in self.get_all_tables().await? {
            let status = self.refresh_table_status(table.number).await?;
            statuses.push((table.number, status));
        }
        Ok(statuses)
    }
}
