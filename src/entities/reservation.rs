//! Reservation entity - A booking of a table for a time window.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a reservation
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Requested, not yet confirmed
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Confirmed with the guest
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Guests are at the table
    #[sea_orm(string_value = "seated")]
    Seated,
    /// Guests left
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Cancelled by either side
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Guests never showed up
    #[sea_orm(string_value = "no_show")]
    NoShow,
}

impl ReservationStatus {
    /// Statuses that hold the table against overlapping bookings.
    pub const BOOKED: [Self; 3] = [Self::Pending, Self::Confirmed, Self::Seated];

    /// True when the reservation marks its table as reserved during its window.
    #[must_use]
    pub const fn holds_table(self) -> bool {
        matches!(self, Self::Confirmed | Self::Seated)
    }
}

/// Reservation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Table being booked
    pub table_number: i32,
    /// Name the booking is under
    pub customer_name: String,
    /// Optional contact number
    pub phone: Option<String>,
    /// Number of guests
    pub party_size: i32,
    /// Start of the window, inclusive
    pub starts_at: DateTimeUtc,
    /// End of the window, exclusive
    pub ends_at: DateTimeUtc,
    /// Current lifecycle state
    pub status: ReservationStatus,
    /// Optional note
    pub note: Option<String>,
    /// When the booking was taken
    pub created_at: DateTimeUtc,
}

/// Reservations are linked to tables by number
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when the window `[starts_at, ends_at)` contains `now`.
    #[must_use]
    pub fn covers(&self, now: DateTimeUtc) -> bool {
        self.starts_at <= now && now < self.ends_at
    }

    /// True when this reservation makes its table `reserved` at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTimeUtc) -> bool {
        self.status.holds_table() && self.covers(now)
    }

    /// True when the windows of `self` and `[starts_at, ends_at)` intersect.
    #[must_use]
    pub fn overlaps(&self, starts_at: DateTimeUtc, ends_at: DateTimeUtc) -> bool {
        self.starts_at < ends_at && starts_at < self.ends_at
    }
}
