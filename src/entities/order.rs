//! Order entity - A table's order and its stored totals.
//!
//! Totals are never patched incrementally: they are recomputed from the order's
//! line items after every item mutation and rounded to cents when stored.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an order
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, no line items yet (or emptied back out)
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Has at least one line item
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Paid and closed; terminal
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Cancelled with stock given back; can be reopened
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Statuses that keep a table occupied.
    pub const OPEN: [Self; 2] = [Self::Pending, Self::InProgress];

    /// True while the order can still receive items.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Number of the table the order is served at
    pub table_number: i32,
    /// Current lifecycle state
    pub status: OrderStatus,
    /// Sum of line totals, excluding VAT
    pub total_ht: f64,
    /// Sum of per-line VAT
    pub tva_amount: f64,
    /// `total_ht` plus VAT
    pub total_ttc: f64,
    /// Optional free-form note
    pub note: Option<String>,
    /// When the order was created
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
    /// When the order was completed or cancelled
    pub closed_at: Option<DateTimeUtc>,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Ledger reference used for every stock movement caused by this order.
    #[must_use]
    pub fn stock_reference(&self) -> String {
        stock_reference(self.id)
    }
}

/// Ledger reference for an order id, e.g. `"order:12"`.
#[must_use]
pub fn stock_reference(order_id: i64) -> String {
    format!("order:{order_id}")
}
