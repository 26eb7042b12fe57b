//! Stock movement entity - One immutable record of the stock ledger.
//!
//! Movements are append-only: a mistake is corrected by a new movement, never by
//! editing or deleting an existing one. The quantity is always stored unsigned;
//! the direction comes from `movement_type`.

use crate::errors;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Direction of a stock movement
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
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock comes in
    #[sea_orm(string_value = "entry")]
    Entry,
    /// Stock goes out
    #[sea_orm(string_value = "exit")]
    Exit,
}

impl MovementType {
    /// Applies the direction to an unsigned quantity.
    #[must_use]
    pub fn signed(self, quantity: f64) -> f64 {
        match self {
            Self::Entry => quantity,
            Self::Exit => -quantity,
        }
    }

    /// Parses `"entry"`/`"exit"`, rejecting anything else as a validation error.
    pub fn parse(value: &str) -> errors::Result<Self> {
        Self::from_str(value.trim())
            .map_err(|_| errors::Error::validation(format!("Unknown movement type: {value}")))
    }
}

/// Why stock moved
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
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum MovementReason {
    /// Goods bought from a supplier
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Sold outside of an order
    #[sea_orm(string_value = "sale")]
    Sale,
    /// Lost stock
    #[sea_orm(string_value = "loss")]
    Loss,
    /// Difference found by a physical inventory count
    #[sea_orm(string_value = "inventory-adjustment")]
    InventoryAdjustment,
    /// Manual correction of an earlier mistake
    #[sea_orm(string_value = "correction")]
    Correction,
    /// Returned goods
    #[sea_orm(string_value = "return")]
    Return,
    /// Damaged goods written off
    #[sea_orm(string_value = "damage")]
    Damage,
    /// Consumed by an order line item
    #[sea_orm(string_value = "order")]
    Order,
    /// Given back because an order or one of its items was cancelled
    #[sea_orm(string_value = "order-cancel")]
    OrderCancel,
    /// Quantity change of an existing order line item
    #[sea_orm(string_value = "order-edit")]
    OrderEdit,
    /// Anything else, explained in the note
    #[sea_orm(string_value = "other")]
    Other,
}

impl MovementReason {
    /// Parses a kebab-case reason such as `"order-cancel"`.
    pub fn parse(value: &str) -> errors::Result<Self> {
        Self::from_str(value.trim())
            .map_err(|_| errors::Error::validation(format!("Unknown movement reason: {value}")))
    }
}

/// Stock movement database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    /// Unique identifier for the movement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product whose stock moved
    pub product_id: i64,
    /// Entry or exit
    pub movement_type: MovementType,
    /// Unsigned quantity, always strictly positive
    pub quantity: f64,
    /// Why the stock moved
    pub reason: MovementReason,
    /// Optional reference to the cause, e.g. `"order:12"`
    pub reference: Option<String>,
    /// Optional free-form note
    pub note: Option<String>,
    /// Cached quantity right before this movement
    pub quantity_before: f64,
    /// Cached quantity right after this movement
    pub quantity_after: f64,
    /// When the movement was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `StockMovement` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each movement belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The movement's quantity with its direction applied.
    #[must_use]
    pub fn signed_quantity(&self) -> f64 {
        self.movement_type.signed(self.quantity)
    }
}
