//! Observer registry for low-stock and order-lifecycle notifications.
//!
//! Listeners are informed after the underlying change has been committed. A
//! listener that fails is logged and skipped; it can never undo the change that
//! triggered it, and it never feeds back into the engine.

use crate::entities::product;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Outcome a listener reports back. Errors are logged, never propagated.
pub type ListenerResult = std::result::Result<(), String>;

type LowStockListener = Box<dyn Fn(&LowStockAlert) -> ListenerResult + Send + Sync>;
type OrderListener = Box<dyn Fn(&OrderEvent) -> ListenerResult + Send + Sync>;

/// A product's quantity dropped to or below its reorder threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct LowStockAlert {
    /// Product concerned
    pub product_id: i64,
    /// Product name, for display
    pub product_name: String,
    /// Quantity after the movement
    pub quantity: f64,
    /// Reorder threshold
    pub min_stock: f64,
}

impl From<&product::Model> for LowStockAlert {
    fn from(product: &product::Model) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: product.quantity,
            min_stock: product.min_stock,
        }
    }
}

/// Order lifecycle notifications
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    /// The order was completed
    Completed {
        /// Order concerned
        order_id: i64,
        /// Table it was served at
        table_number: i32,
        /// Final amount including VAT
        total_ttc: f64,
    },
    /// The order was cancelled and its items given back to stock
    Cancelled {
        /// Order concerned
        order_id: i64,
        /// Table it was served at
        table_number: i32,
        /// Number of line items restituted
        restituted_items: usize,
    },
    /// A cancelled order was reopened and its items taken from stock again
    Reopened {
        /// Order concerned
        order_id: i64,
        /// Table it is served at
        table_number: i32,
    },
}

/// Holds registered listeners and dispatches events to them.
#[derive(Default)]
pub struct Notifier {
    low_stock: RwLock<Vec<LowStockListener>>,
    order_lifecycle: RwLock<Vec<OrderListener>>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

impl Notifier {
    /// Creates a registry with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for low-stock alerts.
    pub async fn on_low_stock<F>(&self, listener: F)
    where
        F: Fn(&LowStockAlert) -> ListenerResult + Send + Sync + 'static,
    {
        self.low_stock.write().await.push(Box::new(listener));
    }

    /// Registers a callback for order lifecycle events.
    pub async fn on_order_lifecycle<F>(&self, listener: F)
    where
        F: Fn(&OrderEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.order_lifecycle.write().await.push(Box::new(listener));
    }

    /// Dispatches a low-stock alert to every registered listener.
    pub async fn low_stock(&self, alert: &LowStockAlert) {
        info!(
            product_id = alert.product_id,
            quantity = alert.quantity,
            min_stock = alert.min_stock,
            "Low stock: {}",
            alert.product_name
        );
        for listener in self.low_stock.read().await.iter() {
            if let Err(e) = listener(alert) {
                warn!(product_id = alert.product_id, "Low-stock listener failed: {}", e);
            }
        }
    }

    /// Dispatches an order lifecycle event to every registered listener.
    pub async fn order_event(&self, event: &OrderEvent) {
        info!(?event, "Order lifecycle event");
        for listener in self.order_lifecycle.read().await.iter() {
            if let Err(e) = listener(event) {
                warn!(?event, "Order lifecycle listener failed: {}", e);
            }
        }
    }
}
