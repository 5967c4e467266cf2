//! Order aggregate, composition tree and related types.

mod aggregate;
mod commands;
mod path;
mod service;
mod state;
mod tree;

pub use aggregate::{GroupSelection, Order};
pub use commands::*;
pub use path::NodePath;
pub use service::OrderService;
pub use state::{OrderStatus, UnknownStatus};
pub use tree::{IngredientGroupNode, ItemNode, MAX_UNIT_NODES, NodeRef, OrderTree, UnfulfilledGroup};

use common::{IngredientGroupId, ItemId, StockId};
use inventory::BoundViolation;
use thiserror::Error;

/// Broad category of a failure, used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced item, group, path, stock record or order does not exist.
    NotFound,
    /// The request violates a quantity or selection constraint.
    Validation,
    /// Not enough stock.
    Stock,
    /// The ingredient group has already been filled.
    AlreadyFulfilled,
    /// The order still has unfulfilled ingredient groups.
    IncompleteOrder,
    /// The order status does not allow the operation.
    InvalidState,
    /// A concurrent writer changed the order first.
    Conflict,
}

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order is not in the expected status.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidStateTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// A selection asks for more units than the item allows.
    #[error("Number of {item} can't exceed {max}")]
    QuantityExceedsMax { item: String, quantity: u32, max: u32 },

    /// The scaled quantity does not fit a price or a stock amount.
    #[error("Quantity {quantity} of {item} is too large")]
    QuantityOverflow { item: String, quantity: u64 },

    /// A non-shareable item would be split into too many nodes.
    #[error("Cannot add {quantity} separate {item} at once (at most {max})")]
    TooManyUnits { item: String, quantity: u32, max: u32 },

    /// Item ids and counts were not given pairwise.
    #[error("Got {items} item ids but {counts} counts")]
    SelectionLengthMismatch { items: usize, counts: usize },

    /// A selection does not satisfy the group's bounds.
    #[error("{violation} in {group}")]
    SelectionOutOfBounds {
        group: String,
        violation: BoundViolation,
    },

    /// Item not found in the catalog.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// Ingredient group not found in the catalog.
    #[error("Ingredient group not found: {0}")]
    IngredientGroupNotFound(IngredientGroupId),

    /// The path does not address an ingredient group of the order.
    #[error("No ingredient group at path {path}")]
    PathNotFound { path: String },

    /// An item references a stock record that does not exist.
    #[error("Stock record not found: {0}")]
    StockRecordNotFound(StockId),

    /// Not enough stock.
    #[error("Not enough stock for {stock_id}: requested {requested}, available {available}")]
    InsufficientStock {
        stock_id: StockId,
        requested: u64,
        available: u64,
    },

    /// Ingredient groups are write-once.
    #[error("Cannot fulfill {group} twice")]
    AlreadyFulfilled { group: String, path: NodePath },

    /// Payment requires every ingredient group to be fulfilled.
    #[error(
        "Ingredient group configuration is not complete: {} of {} at {}",
        .missing.group_id,
        .missing.item_name,
        .missing.path
    )]
    IncompleteOrder { missing: UnfulfilledGroup },
}

impl OrderError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::ItemNotFound(_)
            | OrderError::IngredientGroupNotFound(_)
            | OrderError::PathNotFound { .. }
            | OrderError::StockRecordNotFound(_) => ErrorKind::NotFound,
            OrderError::InvalidQuantity { .. }
            | OrderError::QuantityExceedsMax { .. }
            | OrderError::QuantityOverflow { .. }
            | OrderError::TooManyUnits { .. }
            | OrderError::SelectionLengthMismatch { .. }
            | OrderError::SelectionOutOfBounds { .. } => ErrorKind::Validation,
            OrderError::InsufficientStock { .. } => ErrorKind::Stock,
            OrderError::AlreadyFulfilled { .. } => ErrorKind::AlreadyFulfilled,
            OrderError::IncompleteOrder { .. } => ErrorKind::IncompleteOrder,
            OrderError::InvalidStateTransition { .. } => ErrorKind::InvalidState,
        }
    }
}
