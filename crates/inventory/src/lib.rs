//! Catalog lookup and stock ledger for the food-ordering system.
//!
//! The order engine only needs two collaborators from this crate:
//! - [`Catalog`] resolves item and ingredient-group definitions by id
//! - [`StockLedger`] tracks available stock with atomic decrements
//!
//! Both come with an in-memory implementation for tests and local runs
//! and a PostgreSQL implementation for durable deployments.

pub mod catalog;
pub mod definition;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;

pub use catalog::Catalog;
pub use definition::{
    BoundViolation, IngredientGroupDefinition, IngredientGroupRef, ItemDefinition,
};
pub use error::{InventoryError, Result};
pub use ledger::{StockDeduction, StockLedger, merge_deductions};
pub use memory::{InMemoryCatalog, InMemoryStockLedger};
pub use postgres::{PostgresCatalog, PostgresStockLedger};
