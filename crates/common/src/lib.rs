//! Shared identifiers and value types used across the food-ordering crates.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{IngredientGroupId, ItemId, OrderId, StockId, UserId};
