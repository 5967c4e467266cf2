use common::{IngredientGroupId, StockId};
use thiserror::Error;

/// Errors that can occur when reading the catalog or touching stock.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A decrement would drive the stock record below zero.
    #[error("Insufficient stock for {stock_id}: requested {requested}, available {available}")]
    InsufficientStock {
        stock_id: StockId,
        requested: u64,
        available: u64,
    },

    /// An increase would take the stock record past its capacity.
    #[error("Stock record {stock_id} cannot hold {available} + {amount} units")]
    StockOverflow {
        stock_id: StockId,
        amount: u64,
        available: u64,
    },

    /// The stock record does not exist.
    #[error("Stock record not found: {0}")]
    StockNotFound(StockId),

    /// An ingredient group definition has inconsistent bounds.
    #[error("Invalid bounds for ingredient group {group_id}: {reason}")]
    InvalidBounds {
        group_id: IngredientGroupId,
        reason: String,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
