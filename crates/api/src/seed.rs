//! Catalog seeding from a JSON document.
//!
//! The document lists item definitions, ingredient groups and initial stock:
//!
//! ```json
//! {
//!   "items": [{ "id": "burger", "name": "burger", "price": 500, "stock_id": "burger" }],
//!   "groups": [{ "id": "type", "name": "type", "min_item": 1, "max_item": 1 }],
//!   "stock": [{ "id": "burger", "amount": 10 }]
//! }
//! ```

use std::path::Path;

use common::StockId;
use inventory::{
    IngredientGroupDefinition, InMemoryCatalog, InMemoryStockLedger, InventoryError,
    ItemDefinition, PostgresCatalog, PostgresStockLedger,
};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading a catalog seed.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to store catalog entry: {0}")]
    Inventory(#[from] InventoryError),
}

/// Initial amount of one stock record.
#[derive(Debug, Clone, Deserialize)]
pub struct StockSeed {
    pub id: StockId,
    #[serde(default)]
    pub name: Option<String>,
    pub amount: u64,
}

/// Catalog content to load at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
    #[serde(default)]
    pub groups: Vec<IngredientGroupDefinition>,
    #[serde(default)]
    pub stock: Vec<StockSeed>,
}

impl CatalogSeed {
    /// Parses a seed document.
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a seed file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Loads the seed into in-memory stores.
    pub async fn load_in_memory(
        &self,
        catalog: &InMemoryCatalog,
        ledger: &InMemoryStockLedger,
    ) -> Result<(), SeedError> {
        for group in &self.groups {
            catalog.insert_group(group.clone()).await?;
        }
        for item in &self.items {
            catalog.insert_item(item.clone()).await;
        }
        for stock in &self.stock {
            ledger.set_amount(stock.id.clone(), stock.amount).await;
        }
        self.log_loaded();
        Ok(())
    }

    /// Loads the seed into PostgreSQL, overwriting existing entries.
    ///
    /// Groups are written before items so item rows can reference them.
    pub async fn load_postgres(
        &self,
        catalog: &PostgresCatalog,
        ledger: &PostgresStockLedger,
    ) -> Result<(), SeedError> {
        for group in &self.groups {
            catalog.upsert_group(group).await?;
        }
        for stock in &self.stock {
            let name = stock.name.as_deref().unwrap_or(stock.id.as_str());
            ledger.set_amount(&stock.id, name, stock.amount).await?;
        }
        for item in &self.items {
            catalog.upsert_item(item).await?;
        }
        self.log_loaded();
        Ok(())
    }

    fn log_loaded(&self) {
        tracing::info!(
            items = self.items.len(),
            groups = self.groups.len(),
            stock = self.stock.len(),
            "catalog seeded"
        );
    }
}
