use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    OrderId, OrderQuery, OrderRecord, Result, StoreError, Version,
    store::{OrderRepository, SaveOptions},
};

/// In-memory order store implementation for testing.
///
/// This implementation keeps all records in memory and provides
/// the same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    async fn load(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn save(&self, mut record: OrderRecord, options: SaveOptions) -> Result<Version> {
        let mut orders = self.orders.write().await;

        let current_version = orders
            .get(&record.id)
            .map(|r| r.version)
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                order_id: record.id,
                expected,
                actual: current_version,
            });
        }

        let new_version = current_version.next();
        record.version = new_version;
        orders.insert(record.id, record);

        Ok(new_version)
    }

    async fn list(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let orders = self.orders.read().await;
        let mut records: Vec<_> = orders
            .values()
            .filter(|r| {
                if let Some(user_id) = query.user_id
                    && r.user_id != Some(user_id)
                {
                    return false;
                }
                if let Some(ref status) = query.status
                    && &r.status != status
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        // Newest first
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = query.offset.unwrap_or(0);
        let records = records.into_iter().skip(offset);
        let records = match query.limit {
            Some(limit) => records.take(limit).collect(),
            None => records.collect(),
        };

        Ok(records)
    }
}
