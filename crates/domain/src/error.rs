//! Domain error types.

use common::OrderId;
use inventory::InventoryError;
use order_store::StoreError;
use thiserror::Error;

use crate::order::{ErrorKind, OrderError};

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the catalog or stock ledger.
    #[error("Inventory error: {0}")]
    Inventory(InventoryError),

    /// An error occurred in the order store.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stored order could not be interpreted.
    #[error("Invalid stored order {order_id}: {reason}")]
    InvalidRecord { order_id: OrderId, reason: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns the category of this error, or None for infrastructure failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DomainError::Order(e) => Some(e.kind()),
            DomainError::OrderNotFound(_) => Some(ErrorKind::NotFound),
            DomainError::Store(StoreError::ConcurrencyConflict { .. }) => {
                Some(ErrorKind::Conflict)
            }
            _ => None,
        }
    }
}

/// Stock shortages and missing stock records are order errors; anything
/// else from the inventory crate is an infrastructure failure.
impl From<InventoryError> for DomainError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::InsufficientStock {
                stock_id,
                requested,
                available,
            } => DomainError::Order(OrderError::InsufficientStock {
                stock_id,
                requested,
                available,
            }),
            InventoryError::StockNotFound(stock_id) => {
                DomainError::Order(OrderError::StockRecordNotFound(stock_id))
            }
            other => DomainError::Inventory(other),
        }
    }
}
