//! Stock ledger - the append-only log every stock change goes through.
//!
//! [`append_movement`] writes a movement and the product's new cached quantity
//! through the same connection. Callers pass an open database transaction so that
//! both writes commit together or not at all; an uncommitted transaction that is
//! dropped on an early `?` return rolls both back.

use crate::{
    entities::{
        Product, StockMovement, product,
        stock_movement::{self, MovementReason, MovementType},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use tracing::debug;

/// Quantities are kept to the gram/millilitre to stop float drift accumulating.
const QUANTITY_SCALE: f64 = 1000.0;

/// Rounds a stock quantity to three decimal places.
#[must_use]
pub fn round_quantity(value: f64) -> f64 {
    (value * QUANTITY_SCALE).round() / QUANTITY_SCALE
}

/// A stock movement waiting to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    /// Product to move
    pub product_id: i64,
    /// Unsigned quantity, must be strictly positive
    pub quantity: f64,
    /// Entry or exit
    pub movement_type: MovementType,
    /// Why the stock moves
    pub reason: MovementReason,
    /// Optional reference to the cause (e.g. `"order:12"`)
    pub reference: Option<String>,
    /// Optional free-form note
    pub note: Option<String>,
}

impl NewMovement {
    /// Stock coming in.
    #[must_use]
    pub const fn entry(product_id: i64, quantity: f64, reason: MovementReason) -> Self {
        Self {
            product_id,
            quantity,
            movement_type: MovementType::Entry,
            reason,
            reference: None,
            note: None,
        }
    }

    /// Stock going out.
    #[must_use]
    pub const fn exit(product_id: i64, quantity: f64, reason: MovementReason) -> Self {
        Self {
            product_id,
            quantity,
            movement_type: MovementType::Exit,
            reason,
            reference: None,
            note: None,
        }
    }

    /// Attaches a reference such as an order id.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Attaches a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// What [`append_movement`] wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMovement {
    /// The new ledger entry
    pub movement: stock_movement::Model,
    /// The product with its updated cached quantity
    pub product: product::Model,
    /// True when this movement took the quantity from above the reorder
    /// threshold to at or below it
    pub crossed_low_stock: bool,
}

/// Checks a movement quantity is a finite, strictly positive number.
pub fn validate_quantity(quantity: f64) -> Result<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(Error::validation(format!(
            "Movement quantity must be a positive number, got {quantity}"
        )));
    }
    Ok(())
}

/// Appends a movement to the ledger and updates the product's cached quantity.
///
/// # Errors
/// - [`Error::Validation`] if the quantity is not strictly positive
/// - [`Error::ProductNotFound`] if the product does not exist
/// - [`Error::InsufficientStock`] if an exit would drive the quantity negative;
///   nothing is written in that case
pub async fn append_movement<C>(
    conn: &C,
    movement: NewMovement,
    now: DateTime<Utc>,
) -> Result<RecordedMovement>
where
    C: ConnectionTrait,
{
    validate_quantity(movement.quantity)?;

    let product = Product::find_by_id(movement.product_id)
        .one(conn)
        .await?
        .ok_or(Error::ProductNotFound {
            id: movement.product_id,
        })?;

    let quantity_before = product.quantity;
    if movement.movement_type == MovementType::Exit && movement.quantity > quantity_before {
        return Err(Error::InsufficientStock {
            product_id: product.id,
            available: quantity_before,
            requested: movement.quantity,
        });
    }

    // The stored amount and the cache delta must be the same number.
    let quantity = round_quantity(movement.quantity);
    if quantity <= 0.0 {
        return Err(Error::validation(format!(
            "Movement quantity {} rounds to zero",
            movement.quantity
        )));
    }
    let quantity_after =
        round_quantity(quantity_before + movement.movement_type.signed(quantity));

    let entry = stock_movement::ActiveModel {
        product_id: Set(product.id),
        movement_type: Set(movement.movement_type),
        quantity: Set(quantity),
        reason: Set(movement.reason),
        reference: Set(movement.reference),
        note: Set(movement.note),
        quantity_before: Set(quantity_before),
        quantity_after: Set(quantity_after),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let crossed_low_stock =
        quantity_before > product.min_stock && quantity_after <= product.min_stock;

    let mut cached: product::ActiveModel = product.into();
    cached.quantity = Set(quantity_after);
    cached.updated_at = Set(now);
    let product = cached.update(conn).await?;

    debug!(
        product_id = product.id,
        movement_id = entry.id,
        "{} {} ({}): {} -> {}",
        entry.movement_type,
        entry.quantity,
        entry.reason,
        quantity_before,
        quantity_after
    );

    Ok(RecordedMovement {
        movement: entry,
        product,
        crossed_low_stock,
    })
}

/// Signed sum of every movement recorded for a product.
pub async fn movement_balance<C>(conn: &C, product_id: i64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let entries = sum_movements(conn, product_id, MovementType::Entry).await?;
    let exits = sum_movements(conn, product_id, MovementType::Exit).await?;
    Ok(round_quantity(entries - exits))
}

async fn sum_movements<C>(conn: &C, product_id: i64, movement_type: MovementType) -> Result<f64>
where
    C: ConnectionTrait,
{
    let total: Option<Option<f64>> = StockMovement::find()
        .select_only()
        .column_as(Expr::col(stock_movement::Column::Quantity).sum(), "total")
        .filter(stock_movement::Column::ProductId.eq(product_id))
        .filter(stock_movement::Column::MovementType.eq(movement_type))
        .into_tuple()
        .one(conn)
        .await?;
    Ok(total.flatten().unwrap_or(0.0))
}

/// The quantity a product must have according to its ledger.
pub async fn derived_quantity<C>(conn: &C, product: &product::Model) -> Result<f64>
where
    C: ConnectionTrait,
{
    let balance = movement_balance(conn, product.id).await?;
    Ok(round_quantity(product.initial_stock + balance))
}

/// Retrieves a product's movements, newest first.
pub async fn get_movements_for_product(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Vec<stock_movement::Model>> {
    StockMovement::find()
        .filter(stock_movement::Column::ProductId.eq(product_id))
        .order_by_desc(stock_movement::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every movement carrying a reference, oldest first.
pub async fn get_movements_by_reference(
    db: &DatabaseConnection,
    reference: &str,
) -> Result<Vec<stock_movement::Model>> {
    StockMovement::find()
        .filter(stock_movement::Column::Reference.eq(reference))
        .order_by_asc(stock_movement::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
