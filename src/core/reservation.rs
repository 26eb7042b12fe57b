//! Reservation book - table bookings and their lifecycle.
//!
//! Every change reconciles the booked table, since an active reservation decides
//! whether the table shows as reserved.

use crate::{
    core::{clock::Clock, table::TableCoordinator},
    entities::{
        Reservation,
        reservation::{self, ReservationStatus},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Input for [`ReservationBook::create_reservation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    /// Table to book
    pub table_number: i32,
    /// Name the booking is under
    pub customer_name: String,
    /// Optional contact number
    pub phone: Option<String>,
    /// Number of guests
    pub party_size: i32,
    /// Start of the window, inclusive
    pub starts_at: DateTime<Utc>,
    /// End of the window, exclusive
    pub ends_at: DateTime<Utc>,
    /// Optional note
    pub note: Option<String>,
    /// Book directly as confirmed instead of pending
    pub confirmed: bool,
}

/// Allowed reservation status moves.
#[must_use]
pub const fn can_move(from: ReservationStatus, to: ReservationStatus) -> bool {
    matches!(
        (from, to),
        (
            ReservationStatus::Pending,
            ReservationStatus::Confirmed | ReservationStatus::Cancelled | ReservationStatus::NoShow
        ) | (
            ReservationStatus::Confirmed,
            ReservationStatus::Seated | ReservationStatus::Cancelled | ReservationStatus::NoShow
        ) | (ReservationStatus::Seated, ReservationStatus::Completed)
    )
}

/// Creates reservations and moves them through their lifecycle.
#[derive(Clone)]
pub struct ReservationBook {
    db: DatabaseConnection,
    tables: TableCoordinator,
    clock: Arc<dyn Clock>,
}

impl ReservationBook {
    /// Wires the book to its collaborators.
    #[must_use]
    pub fn new(db: DatabaseConnection, tables: TableCoordinator, clock: Arc<dyn Clock>) -> Self {
        Self { db, tables, clock }
    }

    /// Books a table for a time window.
    ///
    /// # Errors
    /// - [`Error::TableNotFound`] for an unknown table
    /// - [`Error::Validation`] for a blank name, an empty window, a party that
    ///   does not fit the table, or a window overlapping another booking
    #[instrument(skip(self))]
    pub async fn create_reservation(&self, booking: NewReservation) -> Result<reservation::Model> {
        if booking.customer_name.trim().is_empty() {
            return Err(Error::validation("Reservation name cannot be empty"));
        }
        if booking.ends_at <= booking.starts_at {
            return Err(Error::validation("Reservation must end after it starts"));
        }
        if booking.party_size <= 0 {
            return Err(Error::validation(format!(
                "Party size must be positive, got {}",
                booking.party_size
            )));
        }

        let table = self.tables.require_table(booking.table_number).await?;
        if booking.party_size > table.capacity {
            return Err(Error::validation(format!(
                "Table {} seats {}, party of {} does not fit",
                table.number, table.capacity, booking.party_size
            )));
        }

        let clash = Reservation::find()
            .filter(reservation::Column::TableNumber.eq(booking.table_number))
            .filter(reservation::Column::Status.is_in(ReservationStatus::BOOKED))
            .all(&self.db)
            .await?
            .into_iter()
            .find(|existing| existing.overlaps(booking.starts_at, booking.ends_at));
        if let Some(existing) = clash {
            return Err(Error::validation(format!(
                "Table {} is already booked by reservation {}",
                booking.table_number, existing.id
            )));
        }

        let status = if booking.confirmed {
            ReservationStatus::Confirmed
        } else {
            ReservationStatus::Pending
        };
        let created = reservation::ActiveModel {
            table_number: Set(booking.table_number),
            customer_name: Set(booking.customer_name.trim().to_string()),
            phone: Set(booking.phone),
            party_size: Set(booking.party_size),
            starts_at: Set(booking.starts_at),
            ends_at: Set(booking.ends_at),
            status: Set(status),
            note: Set(booking.note),
            created_at: Set(self.clock.now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(reservation_id = created.id, table_number = created.table_number, %status, "Reservation created");
        self.sync_table(created.table_number).await;
        Ok(created)
    }

    /// Retrieves a reservation by id.
    pub async fn get_reservation_by_id(&self, reservation_id: i64) -> Result<Option<reservation::Model>> {
        Reservation::find_by_id(reservation_id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Reservations of a table, earliest first.
    pub async fn get_reservations_for_table(&self, table_number: i32) -> Result<Vec<reservation::Model>> {
        Reservation::find()
            .filter(reservation::Column::TableNumber.eq(table_number))
            .order_by_asc(reservation::Column::StartsAt)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Confirms a pending reservation.
    pub async fn confirm(&self, reservation_id: i64) -> Result<reservation::Model> {
        self.move_to(reservation_id, ReservationStatus::Confirmed).await
    }

    /// Marks the guests as seated.
    pub async fn seat(&self, reservation_id: i64) -> Result<reservation::Model> {
        self.move_to(reservation_id, ReservationStatus::Seated).await
    }

    /// Marks a seated reservation as finished.
    pub async fn complete(&self, reservation_id: i64) -> Result<reservation::Model> {
        self.move_to(reservation_id, ReservationStatus::Completed).await
    }

    /// Cancels a pending or confirmed reservation.
    pub async fn cancel(&self, reservation_id: i64) -> Result<reservation::Model> {
        self.move_to(reservation_id, ReservationStatus::Cancelled).await
    }

    /// Records that the guests never came.
    pub async fn mark_no_show(&self, reservation_id: i64) -> Result<reservation::Model> {
        self.move_to(reservation_id, ReservationStatus::NoShow).await
    }

    #[instrument(skip(self))]
    async fn move_to(
        &self,
        reservation_id: i64,
        status: ReservationStatus,
    ) -> Result<reservation::Model> {
        let booking = Reservation::find_by_id(reservation_id)
            .one(&self.db)
            .await?
            .ok_or(Error::ReservationNotFound { id: reservation_id })?;

        if !can_move(booking.status, status) {
            return Err(Error::validation(format!(
                "Reservation {reservation_id} cannot go from {} to {status}",
                booking.status
            )));
        }

        let mut booking: reservation::ActiveModel = booking.into();
        booking.status = Set(status);
        let booking = booking.update(&self.db).await?;

        info!(reservation_id, %status, "Reservation updated");
        self.sync_table(booking.table_number).await;
        Ok(booking)
    }

    /// Best-effort table reconciliation.
    async fn sync_table(&self, table_number: i32) {
        if let Err(e) = self.tables.refresh_table_status(table_number).await {
            warn!(table_number, "Failed to reconcile table status: {}", e);
        }
    }
}
