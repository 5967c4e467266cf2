use async_trait::async_trait;

use crate::{OrderId, OrderQuery, OrderRecord, Result, Version};

/// Options for saving an order record.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Expected stored version for optimistic concurrency control.
    /// If None, no version check is performed (use with caution).
    pub expected_version: Option<Version>,
}

impl SaveOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stored order to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the order to not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Core trait for order persistence.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Loads an order record by id.
    ///
    /// Returns None if the order was never saved.
    async fn load(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Saves an order record, inserting or replacing it.
    ///
    /// If `options.expected_version` is set, the operation fails with
    /// `ConcurrencyConflict` when the stored version differs. The record's
    /// own `version` field is ignored; the store writes the next version
    /// and returns it.
    async fn save(&self, record: OrderRecord, options: SaveOptions) -> Result<Version>;

    /// Lists order records matching a query, newest first.
    async fn list(&self, query: OrderQuery) -> Result<Vec<OrderRecord>>;
}
