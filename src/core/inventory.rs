//! Inventory service - the only writer of product stock.
//!
//! Wraps the stock ledger with transactions, low-stock notifications, full
//! inventory counts and cache-versus-ledger reconciliation.

use crate::{
    core::{
        clock::Clock,
        events::{LowStockAlert, Notifier},
        ledger::{self, NewMovement, RecordedMovement, round_quantity},
        product as product_store,
    },
    entities::{
        Product, product,
        stock_movement::{self, MovementReason},
    },
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// One line of a physical inventory count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InventoryCount {
    /// Product counted
    pub product_id: i64,
    /// Quantity found on the shelves
    pub counted_quantity: f64,
}

/// Result of [`InventoryService::perform_inventory`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryReport {
    /// One adjustment movement per product whose count differed
    pub movements: Vec<stock_movement::Model>,
    /// Products whose count matched the cached quantity
    pub unchanged: Vec<i64>,
}

/// Comparison of a product's cached quantity with its ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    /// Product checked
    pub product_id: i64,
    /// Quantity stored on the product
    pub cached: f64,
    /// `initial_stock` plus the signed sum of its movements
    pub derived: f64,
    /// True when the cached quantity was rewritten
    pub repaired: bool,
}

impl Reconciliation {
    /// True when cache and ledger agree.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        round_quantity(self.cached - self.derived) == 0.0
    }
}

/// Records stock movements and keeps cached quantities consistent with the ledger.
#[derive(Clone)]
pub struct InventoryService {
    db: DatabaseConnection,
    notifier: Arc<Notifier>,
    clock: Arc<dyn Clock>,
}

impl InventoryService {
    /// Wires the service to its collaborators.
    #[must_use]
    pub fn new(db: DatabaseConnection, notifier: Arc<Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            notifier,
            clock,
        }
    }

    /// Records one movement: ledger entry and cached quantity commit together.
    ///
    /// # Errors
    /// - [`Error::Validation`] for a non-positive quantity
    /// - [`Error::ProductNotFound`] for an unknown product
    /// - [`Error::InsufficientStock`] if an exit exceeds the stock; nothing is written
    #[instrument(skip(self))]
    pub async fn record_movement(&self, movement: NewMovement) -> Result<stock_movement::Model> {
        let txn = self.db.begin().await?;
        let recorded = self.record_movement_in(&txn, movement).await?;
        txn.commit().await?;

        self.publish(std::slice::from_ref(&recorded)).await;
        Ok(recorded.movement)
    }

    /// Records a movement through a caller-owned connection or transaction.
    ///
    /// Nothing is published: the caller must pass the result to [`Self::publish`]
    /// once its transaction has committed.
    pub async fn record_movement_in<C>(
        &self,
        conn: &C,
        movement: NewMovement,
    ) -> Result<RecordedMovement>
    where
        C: ConnectionTrait,
    {
        ledger::append_movement(conn, movement, self.clock.now()).await
    }

    /// Emits low-stock alerts for committed movements that crossed the threshold.
    pub async fn publish(&self, recorded: &[RecordedMovement]) {
        for movement in recorded.iter().filter(|m| m.crossed_low_stock) {
            self.notifier
                .low_stock(&LowStockAlert::from(&movement.product))
                .await;
        }
    }

    /// Brings a product to an exact quantity with a single movement.
    ///
    /// Returns `None` when the product already holds that quantity.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: i64,
        new_quantity: f64,
        reason: MovementReason,
        note: Option<String>,
    ) -> Result<Option<stock_movement::Model>> {
        if !new_quantity.is_finite() || new_quantity < 0.0 {
            return Err(Error::validation(format!(
                "Stock quantity must be a non-negative number, got {new_quantity}"
            )));
        }

        let txn = self.db.begin().await?;
        let product = find_product(&txn, product_id).await?;
        let Some(movement) = movement_towards(&product, new_quantity, reason) else {
            return Ok(None);
        };
        let movement = match note {
            Some(note) => movement.with_note(note),
            None => movement,
        };

        let recorded = self.record_movement_in(&txn, movement).await?;
        txn.commit().await?;

        self.publish(std::slice::from_ref(&recorded)).await;
        Ok(Some(recorded.movement))
    }

    /// Applies a physical inventory count.
    ///
    /// Each product whose counted quantity differs from its cached quantity gets
    /// one `inventory-adjustment` movement for the difference. Matching counts
    /// produce nothing, so re-applying the same count is a no-op. The whole count
    /// is applied in one transaction.
    ///
    /// # Errors
    /// - [`Error::Validation`] for negative counts or a product listed twice
    /// - [`Error::ProductNotFound`] for an unknown product; nothing is written
    #[instrument(skip(self, counts), fields(lines = counts.len()))]
    pub async fn perform_inventory(&self, counts: &[InventoryCount]) -> Result<InventoryReport> {
        let mut seen = HashSet::new();
        for count in counts {
            if !count.counted_quantity.is_finite() || count.counted_quantity < 0.0 {
                return Err(Error::validation(format!(
                    "Counted quantity for product {} must be a non-negative number, got {}",
                    count.product_id, count.counted_quantity
                )));
            }
            if !seen.insert(count.product_id) {
                return Err(Error::validation(format!(
                    "Product {} is counted more than once",
                    count.product_id
                )));
            }
        }

        let txn = self.db.begin().await?;
        let mut report = InventoryReport::default();
        let mut recorded = Vec::new();

        for count in counts {
            let product = find_product(&txn, count.product_id).await?;
            let Some(movement) =
                movement_towards(&product, count.counted_quantity, MovementReason::InventoryAdjustment)
            else {
                report.unchanged.push(product.id);
                continue;
            };

            let movement = movement.with_note(format!(
                "Counted {} {}, expected {}",
                count.counted_quantity, product.unit, product.quantity
            ));
            let outcome = self.record_movement_in(&txn, movement).await?;
            report.movements.push(outcome.movement.clone());
            recorded.push(outcome);
        }

        txn.commit().await?;

        info!(
            adjusted = report.movements.len(),
            unchanged = report.unchanged.len(),
            "Inventory count applied"
        );
        self.publish(&recorded).await;
        Ok(report)
    }

    /// Recomputes a product's quantity from its ledger and repairs the cache if it drifted.
    #[instrument(skip(self))]
    pub async fn recompute_from_ledger(&self, product_id: i64) -> Result<Reconciliation> {
        let txn = self.db.begin().await?;
        let product = find_product(&txn, product_id).await?;
        let mut reconciliation = reconcile(&txn, &product).await?;

        if !reconciliation.is_consistent() {
            warn!(
                product_id,
                cached = reconciliation.cached,
                derived = reconciliation.derived,
                "Cached quantity drifted from ledger, repairing"
            );
            let mut repaired: product::ActiveModel = product.into();
            repaired.quantity = Set(reconciliation.derived);
            repaired.updated_at = Set(self.clock.now());
            repaired.update(&txn).await?;
            reconciliation.repaired = true;
        }

        txn.commit().await?;
        Ok(reconciliation)
    }

    /// Checks every product against its ledger without writing anything.
    pub async fn verify_ledger(&self) -> Result<Vec<Reconciliation>> {
        let mut report = Vec::new();
        for product in product_store::get_all_products(&self.db).await? {
            report.push(reconcile(&self.db, &product).await?);
        }
        Ok(report)
    }

    /// Active products at or below their reorder threshold.
    pub async fn get_low_stock_products(&self) -> Result<Vec<product::Model>> {
        product_store::get_low_stock_products(&self.db).await
    }
}

async fn find_product<C: ConnectionTrait>(conn: &C, product_id: i64) -> Result<product::Model> {
    Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })
}

/// The movement that takes `product` from its cached quantity to `target`, if any.
fn movement_towards(
    product: &product::Model,
    target: f64,
    reason: MovementReason,
) -> Option<NewMovement> {
    let difference = round_quantity(target - product.quantity);
    if difference > 0.0 {
        Some(NewMovement::entry(product.id, difference, reason))
    } else if difference < 0.0 {
        Some(NewMovement::exit(product.id, -difference, reason))
    } else {
        None
    }
}

async fn reconcile<C: ConnectionTrait>(conn: &C, product: &product::Model) -> Result<Reconciliation> {
    Ok(Reconciliation {
        product_id: product.id,
        cached: product.quantity,
        derived: ledger::derived_quantity(conn, product).await?,
        repaired: false,
    })
}
