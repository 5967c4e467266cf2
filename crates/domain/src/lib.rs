//! Order-composition engine for the food-ordering system.
//!
//! This crate provides:
//! - The order tree: items, ingredient groups and dotted node paths
//! - The Order aggregate with its CREATED → PAID → READY status machine
//! - OrderService, which wires the aggregate to a catalog, a stock ledger
//!   and an order store

pub mod error;
pub mod order;

pub use error::DomainError;
pub use order::{
    AddItem, CommandResult, CreateOrder, ErrorKind, FulfillGroup, GroupSelection,
    IngredientGroupNode, ItemNode, MAX_UNIT_NODES, MarkReady, NodePath, NodeRef, Order,
    OrderError, OrderService, OrderStatus, OrderTree, PayOrder, UnfulfilledGroup, UnknownStatus,
};
