use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{IngredientGroupId, ItemId, StockId};
use tokio::sync::{Mutex, RwLock};

use crate::{
    Catalog, IngredientGroupDefinition, InventoryError, ItemDefinition, Result, StockDeduction,
    StockLedger, merge_deductions,
};

/// In-memory catalog for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Arc<RwLock<HashMap<ItemId, ItemDefinition>>>,
    groups: Arc<RwLock<HashMap<IngredientGroupId, IngredientGroupDefinition>>>,
}

impl InMemoryCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an item definition.
    pub async fn insert_item(&self, item: ItemDefinition) {
        self.items.write().await.insert(item.id.clone(), item);
    }

    /// Adds or replaces an ingredient group after validating its bounds.
    pub async fn insert_group(&self, group: IngredientGroupDefinition) -> Result<()> {
        group.validate()?;
        self.groups.write().await.insert(group.id.clone(), group);
        Ok(())
    }

    /// Returns the number of item definitions.
    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<ItemDefinition>> {
        Ok(self.items.read().await.get(item_id).cloned())
    }

    async fn get_ingredient_group(
        &self,
        group_id: &IngredientGroupId,
    ) -> Result<Option<IngredientGroupDefinition>> {
        Ok(self.groups.read().await.get(group_id).cloned())
    }
}

/// In-memory stock ledger.
///
/// A single mutex guards every record, so each check-and-write sequence
/// (including a whole batch) is atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockLedger {
    records: Arc<Mutex<HashMap<StockId, u64>>>,
}

impl InMemoryStockLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites a stock record.
    pub async fn set_amount(&self, stock_id: impl Into<StockId>, amount: u64) {
        self.records.lock().await.insert(stock_id.into(), amount);
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn amount(&self, stock_id: &StockId) -> Result<u64> {
        self.records
            .lock()
            .await
            .get(stock_id)
            .copied()
            .ok_or_else(|| InventoryError::StockNotFound(stock_id.clone()))
    }

    async fn try_decrease(&self, stock_id: &StockId, amount: u64) -> Result<()> {
        let mut records = self.records.lock().await;
        let available = records
            .get_mut(stock_id)
            .ok_or_else(|| InventoryError::StockNotFound(stock_id.clone()))?;

        if *available < amount {
            return Err(InventoryError::InsufficientStock {
                stock_id: stock_id.clone(),
                requested: amount,
                available: *available,
            });
        }

        *available -= amount;
        Ok(())
    }

    async fn increase(&self, stock_id: &StockId, amount: u64) -> Result<()> {
        let mut records = self.records.lock().await;
        let available = records
            .get_mut(stock_id)
            .ok_or_else(|| InventoryError::StockNotFound(stock_id.clone()))?;
        *available = available
            .checked_add(amount)
            .ok_or_else(|| InventoryError::StockOverflow {
                stock_id: stock_id.clone(),
                amount,
                available: *available,
            })?;
        Ok(())
    }

    async fn apply_deductions(&self, deductions: &[StockDeduction]) -> Result<()> {
        let merged = merge_deductions(deductions);
        let mut records = self.records.lock().await;

        // Check every record before writing any of them.
        for deduction in &merged {
            let available = records
                .get(&deduction.stock_id)
                .copied()
                .ok_or_else(|| InventoryError::StockNotFound(deduction.stock_id.clone()))?;
            if available < deduction.amount {
                tracing::debug!(
                    stock_id = %deduction.stock_id,
                    requested = deduction.amount,
                    available,
                    "rejecting stock batch"
                );
                return Err(InventoryError::InsufficientStock {
                    stock_id: deduction.stock_id.clone(),
                    requested: deduction.amount,
                    available,
                });
            }
        }

        for deduction in &merged {
            if let Some(available) = records.get_mut(&deduction.stock_id) {
                *available -= deduction.amount;
            }
        }

        Ok(())
    }
}
