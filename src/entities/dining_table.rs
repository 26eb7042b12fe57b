//! Dining table entity - A physical table of the restaurant.
//!
//! `status` is a cache reconciled by the table status coordinator from the
//! table's open orders and active reservations; it is never a source of truth.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Occupancy state of a table
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
pub enum TableStatus {
    /// Free
    #[sea_orm(string_value = "available")]
    Available,
    /// At least one open order
    #[sea_orm(string_value = "occupied")]
    Occupied,
    /// Covered by an active reservation right now
    #[sea_orm(string_value = "reserved")]
    Reserved,
}

/// Dining table database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dining_tables")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Number printed on the table, unique
    #[sea_orm(unique)]
    pub number: i32,
    /// Seats
    pub capacity: i32,
    /// Cached occupancy state
    pub status: TableStatus,
}

/// Tables are linked to orders and reservations by number, not by foreign key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
