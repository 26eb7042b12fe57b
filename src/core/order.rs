//! Order business logic - Handles the order lifecycle and its line items.
//!
//! Every line-item mutation moves stock through the inventory service and
//! recomputes the order's totals from scratch, inside one database transaction.
//! Table reconciliation and notifications run after commit on a best-effort basis:
//! their failures are logged and never undo the committed change.
//!
//! Lifecycle:
//!
//! ```text
//! pending --first item--> in_progress --last item removed--> pending
//! pending | in_progress --cancel--> cancelled --reopen--> pending | in_progress
//! in_progress --complete--> completed (final)
//! ```

use crate::{
    core::{
        clock::Clock,
        events::{Notifier, OrderEvent},
        inventory::InventoryService,
        ledger::{NewMovement, RecordedMovement},
        pricing::{TaxRates, compute_totals},
        table::TableCoordinator,
    },
    entities::{
        Order, OrderItem, Product,
        order::{self, OrderStatus},
        order_item,
        stock_movement::MovementReason,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// An order together with its line items, ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithItems {
    /// The order
    pub order: order::Model,
    /// Its line items
    pub items: Vec<order_item::Model>,
}

/// Checks an explicit lifecycle move against the transition table.
///
/// `item_count` is the number of line items the order currently has.
///
/// # Errors
/// Returns [`Error::InvalidTransition`] when the move is not allowed.
pub fn check_transition(from: OrderStatus, to: OrderStatus, item_count: usize) -> Result<()> {
    let refuse = |reason: &str| -> Result<()> {
        Err(Error::InvalidTransition {
            from,
            to,
            reason: reason.to_string(),
        })
    };

    match (from, to) {
        (OrderStatus::Completed, _) => refuse("completed orders are final"),
        (OrderStatus::Pending | OrderStatus::InProgress, OrderStatus::Completed)
            if item_count == 0 =>
        {
            refuse("cannot complete an order with no items")
        }
        (OrderStatus::Pending | OrderStatus::InProgress, OrderStatus::Completed | OrderStatus::Cancelled)
        | (OrderStatus::Cancelled, OrderStatus::Pending | OrderStatus::InProgress) => Ok(()),
        (OrderStatus::Pending, OrderStatus::InProgress) if item_count > 0 => Ok(()),
        (OrderStatus::InProgress, OrderStatus::Pending) if item_count == 0 => Ok(()),
        (OrderStatus::Cancelled, OrderStatus::Cancelled) => refuse("order is already cancelled"),
        _ => refuse("transition not allowed"),
    }
}

/// Status an open order must have given its item count.
const fn open_status_for(item_count: usize) -> OrderStatus {
    if item_count == 0 {
        OrderStatus::Pending
    } else {
        OrderStatus::InProgress
    }
}

fn ensure_editable(order: &order::Model) -> Result<()> {
    if order.status.is_open() {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            from: order.status,
            to: OrderStatus::InProgress,
            reason: "items can only change on pending or in-progress orders".to_string(),
        })
    }
}

fn validate_item_quantity(quantity: i32) -> Result<()> {
    if quantity <= 0 {
        return Err(Error::validation(format!(
            "Item quantity must be positive, got {quantity}"
        )));
    }
    Ok(())
}

async fn load_order<C: ConnectionTrait>(conn: &C, order_id: i64) -> Result<order::Model> {
    Order::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })
}

async fn load_item<C: ConnectionTrait>(conn: &C, item_id: i64) -> Result<order_item::Model> {
    OrderItem::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or(Error::OrderItemNotFound { id: item_id })
}

async fn load_items<C: ConnectionTrait>(conn: &C, order_id: i64) -> Result<Vec<order_item::Model>> {
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Creates, edits and closes orders.
#[derive(Clone)]
pub struct OrderService {
    db: DatabaseConnection,
    inventory: InventoryService,
    tables: TableCoordinator,
    tax_rates: TaxRates,
    notifier: Arc<Notifier>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    /// Wires the service to its collaborators.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        inventory: InventoryService,
        tables: TableCoordinator,
        tax_rates: TaxRates,
        notifier: Arc<Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            inventory,
            tables,
            tax_rates,
            notifier,
            clock,
        }
    }

    /// Opens a new, empty order on a table.
    ///
    /// # Errors
    /// Returns [`Error::TableNotFound`] if the table does not exist.
    #[instrument(skip(self))]
    pub async fn create_order(&self, table_number: i32, note: Option<String>) -> Result<order::Model> {
        self.tables.require_table(table_number).await?;

        let now = self.clock.now();
        let order = order::ActiveModel {
            table_number: Set(table_number),
            status: Set(OrderStatus::Pending),
            total_ht: Set(0.0),
            tva_amount: Set(0.0),
            total_ttc: Set(0.0),
            note: Set(note),
            created_at: Set(now),
            updated_at: Set(now),
            closed_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(order_id = order.id, table_number, "Order created");
        self.sync_table(table_number).await;
        Ok(order)
    }

    /// Retrieves an order by id.
    pub async fn get_order_by_id(&self, order_id: i64) -> Result<Option<order::Model>> {
        Order::find_by_id(order_id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Retrieves an order and its items, failing with [`Error::OrderNotFound`].
    pub async fn get_order_with_items(&self, order_id: i64) -> Result<OrderWithItems> {
        let order = load_order(&self.db, order_id).await?;
        let items = load_items(&self.db, order_id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Pending and in-progress orders of a table, oldest first.
    pub async fn get_open_orders_for_table(&self, table_number: i32) -> Result<Vec<order::Model>> {
        Order::find()
            .filter(order::Column::TableNumber.eq(table_number))
            .filter(order::Column::Status.is_in(OrderStatus::OPEN))
            .order_by_asc(order::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// All orders with a given status, oldest first.
    pub async fn get_orders_by_status(&self, status: OrderStatus) -> Result<Vec<order::Model>> {
        Order::find()
            .filter(order::Column::Status.eq(status))
            .order_by_asc(order::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Adds a line item, taking its quantity out of stock first.
    ///
    /// The product's current selling price and category VAT rate are copied into
    /// the item. If stock is insufficient nothing is written.
    ///
    /// # Errors
    /// - [`Error::Validation`] for a non-positive quantity or an inactive product
    /// - [`Error::OrderNotFound`] / [`Error::ProductNotFound`] for unknown ids
    /// - [`Error::InvalidTransition`] if the order is completed or cancelled
    /// - [`Error::InsufficientStock`] if the product cannot cover the quantity
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        order_id: i64,
        product_id: i64,
        quantity: i32,
        note: Option<String>,
    ) -> Result<order_item::Model> {
        validate_item_quantity(quantity)?;

        let txn = self.db.begin().await?;

        let order = load_order(&txn, order_id).await?;
        ensure_editable(&order)?;

        let product = Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or(Error::ProductNotFound { id: product_id })?;
        if !product.is_active {
            return Err(Error::validation(format!(
                "Product {} is no longer sold",
                product.name
            )));
        }

        let recorded = self
            .inventory
            .record_movement_in(
                &txn,
                NewMovement::exit(product.id, f64::from(quantity), MovementReason::Order)
                    .with_reference(order.stock_reference()),
            )
            .await?;

        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            quantity: Set(quantity),
            unit_price: Set(product.selling_price),
            vat_rate: Set(self.tax_rates.rate_for(&product.category)),
            note: Set(note),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let previous_status = order.status;
        let order = self.recompute_order(&txn, order).await?;
        txn.commit().await?;

        info!(order_id, item_id = item.id, product_id, quantity, "Item added");
        self.after_items_changed(&order, previous_status, &[recorded])
            .await;
        Ok(item)
    }

    /// Changes a line item's quantity, moving only the difference in stock.
    ///
    /// A quantity of zero removes the item.
    ///
    /// # Errors
    /// Same as [`Self::add_item`], with [`Error::OrderItemNotFound`] for an unknown item.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(&self, item_id: i64, new_quantity: i32) -> Result<order::Model> {
        if new_quantity == 0 {
            return self.remove_item(item_id).await;
        }
        validate_item_quantity(new_quantity)?;

        let txn = self.db.begin().await?;

        let item = load_item(&txn, item_id).await?;
        let order = load_order(&txn, item.order_id).await?;
        ensure_editable(&order)?;

        let delta = new_quantity - item.quantity;
        if delta == 0 {
            return Ok(order);
        }

        let movement = if delta > 0 {
            NewMovement::exit(item.product_id, f64::from(delta), MovementReason::OrderEdit)
        } else {
            NewMovement::entry(item.product_id, f64::from(-delta), MovementReason::OrderEdit)
        };
        let recorded = self
            .inventory
            .record_movement_in(&txn, movement.with_reference(order.stock_reference()))
            .await?;

        let mut edited: order_item::ActiveModel = item.into();
        edited.quantity = Set(new_quantity);
        edited.update(&txn).await?;

        let previous_status = order.status;
        let order = self.recompute_order(&txn, order).await?;
        txn.commit().await?;

        info!(order_id = order.id, item_id, new_quantity, "Item quantity changed");
        self.after_items_changed(&order, previous_status, &[recorded])
            .await;
        Ok(order)
    }

    /// Removes a line item and gives its quantity back to stock.
    ///
    /// An order left without items goes back to `pending`; it is not deleted.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: i64) -> Result<order::Model> {
        let txn = self.db.begin().await?;

        let item = load_item(&txn, item_id).await?;
        let order = load_order(&txn, item.order_id).await?;
        ensure_editable(&order)?;

        let recorded = self
            .inventory
            .record_movement_in(
                &txn,
                NewMovement::entry(
                    item.product_id,
                    f64::from(item.quantity),
                    MovementReason::OrderCancel,
                )
                .with_reference(order.stock_reference()),
            )
            .await?;

        item.delete(&txn).await?;

        let previous_status = order.status;
        let order = self.recompute_order(&txn, order).await?;
        txn.commit().await?;

        info!(order_id = order.id, item_id, "Item removed");
        self.after_items_changed(&order, previous_status, &[recorded])
            .await;
        Ok(order)
    }

    /// Completes an order. The table is released if nothing else holds it.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] if the order has no items or is not open.
    #[instrument(skip(self))]
    pub async fn complete_order(&self, order_id: i64) -> Result<order::Model> {
        let txn = self.db.begin().await?;

        let order = load_order(&txn, order_id).await?;
        let items = load_items(&txn, order_id).await?;
        check_transition(order.status, OrderStatus::Completed, items.len())?;

        let now = self.clock.now();
        let mut closing: order::ActiveModel = order.into();
        closing.status = Set(OrderStatus::Completed);
        closing.closed_at = Set(Some(now));
        closing.updated_at = Set(now);
        let order = closing.update(&txn).await?;
        txn.commit().await?;

        info!(order_id, total_ttc = order.total_ttc, "Order completed");
        self.sync_table(order.table_number).await;
        self.notifier
            .order_event(&OrderEvent::Completed {
                order_id: order.id,
                table_number: order.table_number,
                total_ttc: order.total_ttc,
            })
            .await;
        Ok(order)
    }

    /// Cancels an open order, giving every line item back to stock.
    ///
    /// Each item is restituted by its own `order-cancel` entry movement. Items stay
    /// attached to the cancelled order as a record of what was ordered.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] if the order is completed or already cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: i64) -> Result<order::Model> {
        let txn = self.db.begin().await?;

        let order = load_order(&txn, order_id).await?;
        let items = load_items(&txn, order_id).await?;
        check_transition(order.status, OrderStatus::Cancelled, items.len())?;

        let reference = order.stock_reference();
        for item in &items {
            self.inventory
                .record_movement_in(
                    &txn,
                    NewMovement::entry(
                        item.product_id,
                        f64::from(item.quantity),
                        MovementReason::OrderCancel,
                    )
                    .with_reference(reference.clone()),
                )
                .await?;
        }

        let now = self.clock.now();
        let mut closing: order::ActiveModel = order.into();
        closing.status = Set(OrderStatus::Cancelled);
        closing.closed_at = Set(Some(now));
        closing.updated_at = Set(now);
        let order = closing.update(&txn).await?;
        txn.commit().await?;

        info!(order_id, restituted_items = items.len(), "Order cancelled");
        self.sync_table(order.table_number).await;
        self.notifier
            .order_event(&OrderEvent::Cancelled {
                order_id: order.id,
                table_number: order.table_number,
                restituted_items: items.len(),
            })
            .await;
        Ok(order)
    }

    /// Reopens a cancelled order.
    ///
    /// Cancellation gave the items back to stock, so reopening takes them out
    /// again with `order` exit movements. If any product cannot cover its item the
    /// order stays cancelled and nothing is written. The order comes back as
    /// `in_progress` when it has items, `pending` otherwise.
    ///
    /// # Errors
    /// - [`Error::InvalidTransition`] if the order is not cancelled
    /// - [`Error::InsufficientStock`] if an item can no longer be covered
    #[instrument(skip(self))]
    pub async fn reopen_order(&self, order_id: i64) -> Result<order::Model> {
        let txn = self.db.begin().await?;

        let order = load_order(&txn, order_id).await?;
        let items = load_items(&txn, order_id).await?;
        let target = open_status_for(items.len());
        if order.status != OrderStatus::Cancelled {
            return Err(Error::InvalidTransition {
                from: order.status,
                to: target,
                reason: "only cancelled orders can be reopened".to_string(),
            });
        }
        check_transition(order.status, target, items.len())?;

        let reference = order.stock_reference();
        let mut recorded = Vec::with_capacity(items.len());
        for item in &items {
            recorded.push(
                self.inventory
                    .record_movement_in(
                        &txn,
                        NewMovement::exit(
                            item.product_id,
                            f64::from(item.quantity),
                            MovementReason::Order,
                        )
                        .with_reference(reference.clone()),
                    )
                    .await?,
            );
        }

        let mut reopening: order::ActiveModel = order.into();
        reopening.status = Set(target);
        reopening.closed_at = Set(None);
        reopening.updated_at = Set(self.clock.now());
        let order = reopening.update(&txn).await?;
        txn.commit().await?;

        info!(order_id, status = %order.status, "Order reopened");
        self.inventory.publish(&recorded).await;
        self.sync_table(order.table_number).await;
        self.notifier
            .order_event(&OrderEvent::Reopened {
                order_id: order.id,
                table_number: order.table_number,
            })
            .await;
        Ok(order)
    }

    /// Moves an open order to another table; both tables are reconciled.
    ///
    /// # Errors
    /// Returns [`Error::TableNotFound`] for an unknown table and
    /// [`Error::InvalidTransition`] if the order is closed.
    #[instrument(skip(self))]
    pub async fn move_order(&self, order_id: i64, table_number: i32) -> Result<order::Model> {
        self.tables.require_table(table_number).await?;

        let order = load_order(&self.db, order_id).await?;
        ensure_editable(&order)?;
        let previous_table = order.table_number;
        if previous_table == table_number {
            return Ok(order);
        }

        let mut moving: order::ActiveModel = order.into();
        moving.table_number = Set(table_number);
        moving.updated_at = Set(self.clock.now());
        let order = moving.update(&self.db).await?;

        info!(order_id, from = previous_table, to = table_number, "Order moved");
        self.sync_table(previous_table).await;
        self.sync_table(table_number).await;
        Ok(order)
    }

    /// Rewrites an open order's totals and status from its current items.
    async fn recompute_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: order::Model,
    ) -> Result<order::Model> {
        let items = load_items(conn, order.id).await?;
        let totals = compute_totals(&items);
        let status = open_status_for(items.len());
        if status != order.status {
            check_transition(order.status, status, items.len())?;
        }

        let mut order: order::ActiveModel = order.into();
        order.status = Set(status);
        order.total_ht = Set(totals.total_ht);
        order.tva_amount = Set(totals.tva_amount);
        order.total_ttc = Set(totals.total_ttc);
        order.updated_at = Set(self.clock.now());
        order.update(conn).await.map_err(Into::into)
    }

    async fn after_items_changed(
        &self,
        order: &order::Model,
        previous_status: OrderStatus,
        recorded: &[RecordedMovement],
    ) {
        self.inventory.publish(recorded).await;
        if order.status != previous_status {
            self.sync_table(order.table_number).await;
        }
    }

    /// Best-effort table reconciliation.
    async fn sync_table(&self, table_number: i32) {
        if let Err(e) = self.tables.refresh_table_status(table_number).await {
            warn!(table_number, "Failed to reconcile table status: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::{
            ledger,
            pricing::compute_totals,
            product::{self, NewProduct, ProductUpdate},
            reservation::NewReservation,
        },
        entities::{TableStatus, stock_movement::MovementType},
        test_utils::*,
    };
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[test]
    fn test_check_transition_table() {
        assert!(check_transition(OrderStatus::InProgress, OrderStatus::Completed, 2).is_ok());
        assert!(check_transition(OrderStatus::Pending, OrderStatus::Cancelled, 0).is_ok());
        assert!(check_transition(OrderStatus::Cancelled, OrderStatus::Pending, 0).is_ok());
        assert!(check_transition(OrderStatus::Pending, OrderStatus::Completed, 0).is_err());
        assert!(check_transition(OrderStatus::Completed, OrderStatus::Cancelled, 1).is_err());
        assert!(check_transition(OrderStatus::Cancelled, OrderStatus::Completed, 1).is_err());
        assert!(check_transition(OrderStatus::Cancelled, OrderStatus::Cancelled, 1).is_err());
    }

    #[tokio::test]
    async fn test_add_item_moves_stock_and_alerts_once() -> Result<()> {
        let engine = setup_engine().await?;
        engine.tables.create_table(1, 4).await?;
        let product = create_product_with(
            &engine,
            NewProduct {
                initial_stock: 5.0,
                ..test_product("Burrata")
            },
        )
        .await?;

        let alerts = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&alerts);
        engine
            .notifier
            .on_low_stock(move |alert| {
                sink.lock().unwrap().push(alert.quantity);
                Ok(())
            })
            .await;

        let first = engine.orders.create_order(1, None).await?;
        let item = engine.orders.add_item(first.id, product.id, 4, None).await?;
        assert_eq!(item.quantity, 4);
        assert_eq!(reload_product(&engine, product.id).await?.quantity, 1.0);
        assert_eq!(*alerts.lock().unwrap(), vec![1.0]);

        let second = engine.orders.create_order(1, None).await?;
        let result = engine.orders.add_item(second.id, product.id, 2, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientStock {
                available: 1.0,
                requested: 2.0,
                ..
            }
        ));

        assert_eq!(reload_product(&engine, product.id).await?.quantity, 1.0);
        let second = engine.orders.get_order_with_items(second.id).await?;
        assert!(second.items.is_empty());
        assert_eq!(second.order.status, OrderStatus::Pending);
        assert_eq!(
            ledger::get_movements_for_product(engine.db(), product.id)
                .await?
                .len(),
            1
        );
        assert_eq!(alerts.lock().unwrap().len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_first_item_starts_order_and_snapshots_price() -> Result<()> {
        let (engine, product) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;

        let order = engine.orders.create_order(1, Some("window seat".into())).await?;
        assert_eq!(order.status, OrderStatus::Pending);

        let item = engine.orders.add_item(order.id, product.id, 2, None).await?;
        assert_eq!(item.unit_price, 5.0);
        assert_eq!(item.vat_rate, 0.1);
        assert_eq!(item.product_name, "Test Product");

        product::update_product(
            engine.db(),
            product.id,
            ProductUpdate {
                selling_price: Some(7.0),
                ..Default::default()
            },
            engine.now(),
        )
        .await?;

        let stored = engine.orders.get_order_with_items(order.id).await?;
        assert_eq!(stored.order.status, OrderStatus::InProgress);
        assert_eq!(stored.items[0].unit_price, 5.0);
        assert_eq!(stored.order.total_ht, 10.0);
        assert_eq!(stored.order.tva_amount, 1.0);
        assert_eq!(stored.order.total_ttc, 11.0);

        let movements = ledger::get_movements_by_reference(engine.db(), &order.stock_reference())
            .await?;
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Exit);
        assert_eq!(movements[0].reason, MovementReason::Order);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_validation() -> Result<()> {
        let (engine, product) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;
        let order = engine.orders.create_order(1, None).await?;

        let result = engine.orders.add_item(order.id, product.id, 0, None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        let result = engine.orders.add_item(order.id, 999, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::ProductNotFound { id: 999 }));

        let result = engine.orders.add_item(999, product.id, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::OrderNotFound { id: 999 }));

        product::deactivate_product(engine.db(), product.id, engine.now()).await?;
        let result = engine.orders.add_item(order.id, product.id, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));
        assert_eq!(reload_product(&engine, product.id).await?.quantity, 10.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_on_unknown_table() -> Result<()> {
        let engine = setup_engine().await?;
        let result = engine.orders.create_order(12, None).await;
        assert!(matches!(result.unwrap_err(), Error::TableNotFound { number: 12 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_item_quantity_moves_only_the_delta() -> Result<()> {
        let (engine, product) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;
        let order = engine.orders.create_order(1, None).await?;
        let item = engine.orders.add_item(order.id, product.id, 2, None).await?;

        let order = engine.orders.update_item_quantity(item.id, 5).await?;
        assert_eq!(reload_product(&engine, product.id).await?.quantity, 5.0);
        assert_eq!(order.total_ht, 25.0);

        engine.orders.update_item_quantity(item.id, 1).await?;
        assert_eq!(reload_product(&engine, product.id).await?.quantity, 9.0);

        let edits: Vec<_> = ledger::get_movements_by_reference(engine.db(), &order.stock_reference())
            .await?
            .into_iter()
            .filter(|m| m.reason == MovementReason::OrderEdit)
            .map(|m| m.signed_quantity())
            .collect();
        assert_eq!(edits, vec![-3.0, 4.0]);

        let result = engine.orders.update_item_quantity(item.id, 20).await;
        assert!(matches!(result.unwrap_err(), Error::InsufficientStock { .. }));
        assert_eq!(reload_product(&engine, product.id).await?.quantity, 9.0);

        let result = engine.orders.update_item_quantity(item.id, -1).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_removing_last_item_returns_order_to_pending() -> Result<()> {
        let (engine, product) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;
        let order = engine.orders.create_order(1, None).await?;
        let item = engine.orders.add_item(order.id, product.id, 3, None).await?;

        let order = engine.orders.update_item_quantity(item.id, 0).await?;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_ttc, 0.0);
        assert_eq!(reload_product(&engine, product.id).await?.quantity, 10.0);

        let result = engine.orders.remove_item(item.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::OrderItemNotFound { .. }
        ));
        assert!(engine.orders.get_order_by_id(order.id).await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_stored_totals_match_recomputation() -> Result<()> {
        let (engine, pasta) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;
        let wine = create_product_with(
            &engine,
            NewProduct {
                category: "drinks".to_string(),
                selling_price: 6.35,
                ..test_product("Wine")
            },
        )
        .await?;

        let order = engine.orders.create_order(1, None).await?;
        engine.orders.add_item(order.id, pasta.id, 3, None).await?;
        let wine_item = engine.orders.add_item(order.id, wine.id, 2, None).await?;
        engine.orders.update_item_quantity(wine_item.id, 3).await?;

        let stored = engine.orders.get_order_with_items(order.id).await?;
        let totals = compute_totals(&stored.items);
        assert_eq!(stored.order.total_ht, totals.total_ht);
        assert_eq!(stored.order.tva_amount, totals.tva_amount);
        assert_eq!(stored.order.total_ttc, totals.total_ttc);
        assert_eq!(stored.order.total_ht, 34.05);

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_order() -> Result<()> {
        let (engine, product) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;

        let empty = engine.orders.create_order(1, None).await?;
        let result = engine.orders.complete_order(empty.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Completed,
                ..
            }
        ));
        engine.orders.cancel_order(empty.id).await?;

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        engine
            .notifier
            .on_order_lifecycle(move |event| {
                sink.lock().unwrap().push(event.clone());
                Ok(())
            })
            .await;

        let order = engine.orders.create_order(1, None).await?;
        engine.orders.add_item(order.id, product.id, 2, None).await?;
        let order = engine.orders.complete_order(order.id).await?;

        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.closed_at.is_some());
        assert_eq!(
            engine.tables.require_table(1).await?.status,
            TableStatus::Available
        );
        assert_eq!(
            *events.lock().unwrap(),
            vec![OrderEvent::Completed {
                order_id: order.id,
                table_number: 1,
                total_ttc: 11.0,
            }]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_completed_order_is_final() -> Result<()> {
        let (engine, product) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;
        let order = engine.orders.create_order(1, None).await?;
        let item = engine.orders.add_item(order.id, product.id, 1, None).await?;
        engine.orders.complete_order(order.id).await?;

        let result = engine.orders.cancel_order(order.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));
        let result = engine.orders.reopen_order(order.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));
        let result = engine.orders.add_item(order.id, product.id, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));
        let result = engine.orders.update_item_quantity(item.id, 3).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));
        let result = engine.orders.complete_order(order.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));

        assert_eq!(reload_product(&engine, product.id).await?.quantity, 9.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_order_restitutes_each_item() -> Result<()> {
        let (engine, a) = setup_engine_with_product().await?;
        let b = create_product_with(&engine, test_product("Bread")).await?;
        engine.tables.create_table(1, 4).await?;

        let order = engine.orders.create_order(1, None).await?;
        engine.orders.add_item(order.id, a.id, 3, None).await?;
        engine.orders.add_item(order.id, b.id, 2, None).await?;
        assert_eq!(reload_product(&engine, a.id).await?.quantity, 7.0);

        let cancelled = engine.orders.cancel_order(order.id).await?;
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(reload_product(&engine, a.id).await?.quantity, 10.0);
        assert_eq!(reload_product(&engine, b.id).await?.quantity, 10.0);

        let restitutions: Vec<_> =
            ledger::get_movements_by_reference(engine.db(), &order.stock_reference())
                .await?
                .into_iter()
                .filter(|m| m.reason == MovementReason::OrderCancel)
                .map(|m| (m.product_id, m.movement_type, m.quantity))
                .collect();
        assert_eq!(
            restitutions,
            vec![
                (a.id, MovementType::Entry, 3.0),
                (b.id, MovementType::Entry, 2.0)
            ]
        );

        // Items stay on the cancelled order.
        let stored = engine.orders.get_order_with_items(order.id).await?;
        assert_eq!(stored.items.len(), 2);

        let result = engine.orders.cancel_order(order.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_order_takes_stock_again() -> Result<()> {
        let (engine, product) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;

        let order = engine.orders.create_order(1, None).await?;
        engine.orders.add_item(order.id, product.id, 4, None).await?;
        engine.orders.cancel_order(order.id).await?;
        assert_eq!(reload_product(&engine, product.id).await?.quantity, 10.0);

        let reopened = engine.orders.reopen_order(order.id).await?;
        assert_eq!(reopened.status, OrderStatus::InProgress);
        assert!(reopened.closed_at.is_none());
        assert_eq!(reload_product(&engine, product.id).await?.quantity, 6.0);
        assert_eq!(
            engine.tables.require_table(1).await?.status,
            TableStatus::Occupied
        );

        let result = engine.orders.reopen_order(order.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_fails_without_stock() -> Result<()> {
        let (engine, product) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;

        let order = engine.orders.create_order(1, None).await?;
        engine.orders.add_item(order.id, product.id, 6, None).await?;
        engine.orders.cancel_order(order.id).await?;

        let other = engine.orders.create_order(1, None).await?;
        engine.orders.add_item(other.id, product.id, 7, None).await?;

        let result = engine.orders.reopen_order(order.id).await;
        assert!(matches!(result.unwrap_err(), Error::InsufficientStock { .. }));

        let stored = engine.orders.get_order_by_id(order.id).await?.unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(reload_product(&engine, product.id).await?.quantity, 3.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_cancelled_order_reopens_pending() -> Result<()> {
        let engine = setup_engine().await?;
        engine.tables.create_table(1, 4).await?;
        let order = engine.orders.create_order(1, None).await?;
        engine.orders.cancel_order(order.id).await?;

        let reopened = engine.orders.reopen_order(order.id).await?;
        assert_eq!(reopened.status, OrderStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_order_reconciles_both_tables() -> Result<()> {
        let engine = setup_engine().await?;
        engine.tables.create_table(1, 2).await?;
        engine.tables.create_table(2, 4).await?;

        let order = engine.orders.create_order(1, None).await?;
        let moved = engine.orders.move_order(order.id, 2).await?;
        assert_eq!(moved.table_number, 2);

        assert_eq!(
            engine.tables.require_table(1).await?.status,
            TableStatus::Available
        );
        assert_eq!(
            engine.tables.require_table(2).await?.status,
            TableStatus::Occupied
        );
        assert_eq!(engine.orders.get_open_orders_for_table(2).await?.len(), 1);

        let result = engine.orders.move_order(order.id, 9).await;
        assert!(matches!(result.unwrap_err(), Error::TableNotFound { number: 9 }));

        Ok(())
    }

    #[tokio::test]
    async fn test_completing_order_keeps_reserved_table_reserved() -> Result<()> {
        let at = |hour| Utc.with_ymd_and_hms(2026, 10, 16, hour, 0, 0).unwrap();
        let engine = setup_engine_at(at(20)).await?;
        engine.tables.create_table(7, 4).await?;
        let product = create_product_with(&engine, test_product("Tartare")).await?;

        engine
            .reservations
            .create_reservation(NewReservation {
                table_number: 7,
                customer_name: "Martin".to_string(),
                phone: None,
                party_size: 4,
                starts_at: at(19),
                ends_at: at(21),
                note: None,
                confirmed: true,
            })
            .await?;

        let order = engine.orders.create_order(7, None).await?;
        engine.orders.add_item(order.id, product.id, 2, None).await?;
        engine.orders.complete_order(order.id).await?;

        assert_eq!(
            engine.tables.require_table(7).await?.status,
            TableStatus::Reserved
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_orders_by_status() -> Result<()> {
        let (engine, product) = setup_engine_with_product().await?;
        engine.tables.create_table(1, 4).await?;

        let a = engine.orders.create_order(1, None).await?;
        let b = engine.orders.create_order(1, None).await?;
        engine.orders.add_item(b.id, product.id, 1, None).await?;

        let pending = engine.orders.get_orders_by_status(OrderStatus::Pending).await?;
        let in_progress = engine
            .orders
            .get_orders_by_status(OrderStatus::InProgress)
            .await?;
        assert_eq!(pending.iter().map(|o| o.id).collect::<Vec<_>>(), vec![a.id]);
        assert_eq!(in_progress.iter().map(|o| o.id).collect::<Vec<_>>(), vec![b.id]);
        assert_eq!(engine.orders.get_open_orders_for_table(1).await?.len(), 2);

        Ok(())
    }
}
