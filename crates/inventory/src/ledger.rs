use std::collections::BTreeMap;

use async_trait::async_trait;
use common::StockId;

use crate::Result;

/// A quantity of stock units to take from one stock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDeduction {
    pub stock_id: StockId,
    pub amount: u64,
}

impl StockDeduction {
    /// Creates a new deduction.
    pub fn new(stock_id: impl Into<StockId>, amount: u64) -> Self {
        Self {
            stock_id: stock_id.into(),
            amount,
        }
    }
}

/// Tracks available quantity per stock record.
///
/// Decrements are compare-and-decrement: implementations must make the
/// read-check-write sequence atomic per record so concurrent checkouts
/// cannot oversell.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Returns the currently available amount.
    async fn amount(&self, stock_id: &StockId) -> Result<u64>;

    /// Decreases a record, failing if it would go below zero.
    async fn try_decrease(&self, stock_id: &StockId, amount: u64) -> Result<()>;

    /// Increases a record. Used for restocking and compensation.
    async fn increase(&self, stock_id: &StockId, amount: u64) -> Result<()>;

    /// Applies a batch of deductions all-or-nothing.
    ///
    /// Every record is checked before any is written; if one record is
    /// short, no record is changed.
    async fn apply_deductions(&self, deductions: &[StockDeduction]) -> Result<()>;
}

/// Sums deductions per stock record, dropping zero amounts.
///
/// The result is sorted by stock id, which gives every caller the same
/// lock acquisition order.
pub fn merge_deductions<'a>(
    deductions: impl IntoIterator<Item = &'a StockDeduction>,
) -> Vec<StockDeduction> {
    let mut merged: BTreeMap<StockId, u64> = BTreeMap::new();
    for deduction in deductions {
        // Saturates instead of wrapping.
        let total = merged.entry(deduction.stock_id.clone()).or_default();
        *total = total.saturating_add(deduction.amount);
    }
    merged
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(stock_id, amount)| StockDeduction { stock_id, amount })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sums_per_record_and_sorts() {
        let deductions = vec![
            StockDeduction::new("patty", 3),
            StockDeduction::new("bun", 2),
            StockDeduction::new("patty", 3),
            StockDeduction::new("sauce", 0),
        ];

        let merged = merge_deductions(&deductions);

        assert_eq!(
            merged,
            vec![StockDeduction::new("bun", 2), StockDeduction::new("patty", 6)]
        );
    }

    #[test]
    fn test_merge_saturates() {
        let deductions = vec![
            StockDeduction::new("patty", u64::MAX - 1),
            StockDeduction::new("patty", 5),
        ];

        let merged = merge_deductions(&deductions);

        assert_eq!(merged, vec![StockDeduction::new("patty", u64::MAX)]);
    }

    #[test]
    fn test_merge_empty() {
        let none: Vec<StockDeduction> = Vec::new();
        assert!(merge_deductions(&none).is_empty());
    }
}
