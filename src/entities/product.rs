//! Product entity - Represents a sellable or stocked item of the restaurant.
//!
//! `quantity` is a cached value derived from the stock ledger. It always equals
//! `initial_stock` plus the signed sum of the product's stock movements, and is
//! written only by the inventory service.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Espresso", "Flour")
    pub name: String,
    /// Category, also used to pick the VAT rate (e.g., "food", "drinks")
    pub category: String,
    /// Unit of measure (e.g., "unit", "kg", "l")
    pub unit: String,
    /// Stock level the product was created with, the ledger's starting point
    pub initial_stock: f64,
    /// Current stock level, derived from the ledger
    pub quantity: f64,
    /// Reorder threshold; reaching it raises a low-stock alert
    pub min_stock: f64,
    /// Purchase price per unit
    pub purchase_price: f64,
    /// Selling price per unit, excluding VAT
    pub selling_price: f64,
    /// Inactive products cannot be added to orders
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product has many stock movements
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
    /// One product appears in many order items
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when the cached quantity is at or below the reorder threshold.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }
}
