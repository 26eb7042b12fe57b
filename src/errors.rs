//! Unified error types for the engine.
//!
//! Every service returns [`Result`]. Domain failures (unknown ids, insufficient
//! stock, illegal lifecycle moves, bad input) are recoverable at the caller
//! boundary; database failures are surfaced unchanged and never retried here.

use crate::entities::order::OrderStatus;
use thiserror::Error;

/// All errors raised by the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// The persistence layer failed; fatal for the current operation
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown product id
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Requested product id
        id: i64,
    },

    /// Unknown order id
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// Requested order id
        id: i64,
    },

    /// Unknown order line item id
    #[error("Order item not found: {id}")]
    OrderItemNotFound {
        /// Requested item id
        id: i64,
    },

    /// Unknown table number
    #[error("Table not found: {number}")]
    TableNotFound {
        /// Requested table number
        number: i32,
    },

    /// Unknown reservation id
    #[error("Reservation not found: {id}")]
    ReservationNotFound {
        /// Requested reservation id
        id: i64,
    },

    /// An exit movement would drive the product's quantity below zero
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        /// Product being moved
        product_id: i64,
        /// Cached quantity at the time of the request
        available: f64,
        /// Quantity the exit asked for
        requested: f64,
    },

    /// Illegal order status change
    #[error("Invalid order transition from {from} to {to}: {reason}")]
    InvalidTransition {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
        /// Why the move is refused
        reason: String,
    },

    /// Missing or malformed input
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },
}

/// Coarse classification of [`Error`], for callers that surface one message per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown product, order, item, table or reservation
    NotFound,
    /// Exit larger than available stock
    InsufficientStock,
    /// Illegal order status change
    InvalidTransition,
    /// Rejected input
    Validation,
    /// Database or filesystem failure
    Persistence,
    /// Bad configuration
    Configuration,
}

impl Error {
    /// Builds a [`Error::Validation`] from anything string-like.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns the class this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ProductNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::OrderItemNotFound { .. }
            | Self::TableNotFound { .. }
            | Self::ReservationNotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Database(_) | Self::Io(_) => ErrorKind::Persistence,
            Self::Config { .. } => ErrorKind::Configuration,
        }
    }

    /// True for every "unknown id" variant.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
