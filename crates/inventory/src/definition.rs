//! Catalog definitions for items and ingredient groups.

use common::{IngredientGroupId, ItemId, Money, StockId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{InventoryError, Result};

fn default_stock_unit() -> u32 {
    1
}

/// Reference from an item to one of its ingredient groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientGroupRef {
    pub id: IngredientGroupId,
    pub name: String,
}

/// A purchasable or composable product as defined in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// The item identifier.
    pub id: ItemId,

    /// Human-readable item name.
    pub name: String,

    /// Price per unit.
    pub price: Money,

    /// Maximum quantity a single selection may request.
    #[serde(default)]
    pub max_quantity: Option<u32>,

    /// Stock record consumed by this item. `None` means untracked.
    #[serde(default)]
    pub stock_id: Option<StockId>,

    /// Stock units consumed per unit of this item.
    #[serde(default = "default_stock_unit")]
    pub stock_unit: u32,

    /// Whether identical selections collapse into a single node with a quantity.
    #[serde(default)]
    pub shareable: bool,

    /// Ingredient groups every node of this item carries, in order.
    #[serde(default)]
    pub groups: Vec<IngredientGroupRef>,
}

impl ItemDefinition {
    /// Creates an untracked, non-shareable item with no ingredient groups.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            max_quantity: None,
            stock_id: None,
            stock_unit: default_stock_unit(),
            shareable: false,
            groups: Vec::new(),
        }
    }

    /// Marks the item as shareable.
    pub fn shareable(mut self) -> Self {
        self.shareable = true;
        self
    }

    /// Caps the quantity of a single selection.
    pub fn with_max_quantity(mut self, max: u32) -> Self {
        self.max_quantity = Some(max);
        self
    }

    /// Backs the item by a stock record, consuming `unit` stock units per item.
    pub fn with_stock(mut self, stock_id: impl Into<StockId>, unit: u32) -> Self {
        self.stock_id = Some(stock_id.into());
        self.stock_unit = unit;
        self
    }

    /// Appends an ingredient group.
    pub fn with_group(mut self, id: impl Into<IngredientGroupId>, name: impl Into<String>) -> Self {
        self.groups.push(IngredientGroupRef {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    /// Returns true if `quantity` is above the max-order quantity.
    pub fn exceeds_max_quantity(&self, quantity: u32) -> bool {
        self.max_quantity.is_some_and(|max| quantity > max)
    }

    /// Stock units consumed by `quantity` units of this item, or `None` on overflow.
    pub fn stock_units(&self, quantity: u64) -> Option<u64> {
        quantity.checked_mul(u64::from(self.stock_unit))
    }
}

/// A bound of an ingredient group that a selection does not satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoundViolation {
    #[error("at least {min} different offerings must be selected")]
    TooFewOptions { min: u32 },

    #[error("at most {max} different offerings can be selected")]
    TooManyOptions { max: u32 },

    #[error("at least {min} items must be chosen")]
    TooFewItems { min: u32 },

    #[error("at most {max} items can be chosen")]
    TooManyItems { max: u32 },
}

/// A named choice set attached to an item, with selection constraints.
///
/// Absent bounds are unbounded on that side; an absent minimum behaves as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientGroupDefinition {
    pub id: IngredientGroupId,
    pub name: String,
    #[serde(default)]
    pub min_option: Option<u32>,
    #[serde(default)]
    pub max_option: Option<u32>,
    #[serde(default)]
    pub min_item: Option<u32>,
    #[serde(default)]
    pub max_item: Option<u32>,
}

impl IngredientGroupDefinition {
    /// Creates an unconstrained ingredient group.
    pub fn new(id: impl Into<IngredientGroupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            min_option: None,
            max_option: None,
            min_item: None,
            max_item: None,
        }
    }

    /// Sets the bounds on the number of distinct options.
    pub fn option_bounds(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_option = min;
        self.max_option = max;
        self
    }

    /// Sets the bounds on the total number of items.
    pub fn item_bounds(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_item = min;
        self.max_item = max;
        self
    }

    /// Checks that every present minimum is not above its maximum.
    pub fn validate(&self) -> Result<()> {
        let pairs = [
            ("option", self.min_option, self.max_option),
            ("item", self.min_item, self.max_item),
        ];
        for (label, min, max) in pairs {
            if let (Some(min), Some(max)) = (min, max)
                && min > max
            {
                return Err(InventoryError::InvalidBounds {
                    group_id: self.id.clone(),
                    reason: format!("min_{label} ({min}) exceeds max_{label} ({max})"),
                });
            }
        }
        Ok(())
    }

    /// Checks a selection against the group's bounds.
    ///
    /// Option bounds are checked before item bounds, minimums before maximums.
    pub fn check_selection(
        &self,
        distinct_options: usize,
        total_items: u64,
    ) -> std::result::Result<(), BoundViolation> {
        let options = distinct_options as u64;

        if let Some(min) = self.min_option
            && options < u64::from(min)
        {
            return Err(BoundViolation::TooFewOptions { min });
        }
        if let Some(max) = self.max_option
            && options > u64::from(max)
        {
            return Err(BoundViolation::TooManyOptions { max });
        }
        if let Some(min) = self.min_item
            && total_items < u64::from(min)
        {
            return Err(BoundViolation::TooFewItems { min });
        }
        if let Some(max) = self.max_item
            && total_items > u64::from(max)
        {
            return Err(BoundViolation::TooManyItems { max });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exactly_one() -> IngredientGroupDefinition {
        IngredientGroupDefinition::new("type", "type")
            .option_bounds(Some(1), Some(1))
            .item_bounds(Some(1), Some(1))
    }

    #[test]
    fn test_item_builder_defaults() {
        let item = ItemDefinition::new("burger", "Burger", Money::from_cents(500));
        assert!(!item.shareable);
        assert_eq!(item.stock_unit, 1);
        assert!(item.stock_id.is_none());
        assert!(item.groups.is_empty());
        assert!(!item.exceeds_max_quantity(1_000));
    }

    #[test]
    fn test_stock_units_scale_with_multiplier() {
        let nuggets = ItemDefinition::new("six-pack", "6-pack Nuggets", Money::from_cents(1200))
            .with_stock("nuggets", 6);
        assert_eq!(nuggets.stock_units(2), Some(12));
        assert_eq!(nuggets.stock_units(u64::MAX / 2), None);
    }

    #[test]
    fn test_max_quantity() {
        let item =
            ItemDefinition::new("coke", "Coke", Money::from_cents(300)).with_max_quantity(2);
        assert!(!item.exceeds_max_quantity(2));
        assert!(item.exceeds_max_quantity(3));
    }

    #[test]
    fn test_groups_keep_definition_order() {
        let main = ItemDefinition::new("main", "Main", Money::zero())
            .with_group("type", "Main Type")
            .with_group("patties", "Patties");
        let names: Vec<_> = main.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Main Type", "Patties"]);
    }

    #[test]
    fn test_validate_rejects_min_above_max() {
        let group = IngredientGroupDefinition::new("bun", "Bun").item_bounds(Some(3), Some(2));
        assert!(matches!(
            group.validate(),
            Err(InventoryError::InvalidBounds { .. })
        ));
        assert!(exactly_one().validate().is_ok());
    }

    #[test]
    fn test_check_selection_bounds() {
        let group = exactly_one();
        assert_eq!(group.check_selection(1, 1), Ok(()));
        assert_eq!(
            group.check_selection(0, 0),
            Err(BoundViolation::TooFewOptions { min: 1 })
        );
        assert_eq!(
            group.check_selection(2, 2),
            Err(BoundViolation::TooManyOptions { max: 1 })
        );
        assert_eq!(
            group.check_selection(1, 2),
            Err(BoundViolation::TooManyItems { max: 1 })
        );
    }

    #[test]
    fn test_unbounded_group_accepts_empty_selection() {
        let sauce = IngredientGroupDefinition::new("sauce", "Sauce").option_bounds(None, Some(3));
        assert_eq!(sauce.check_selection(0, 0), Ok(()));
        assert_eq!(
            sauce.check_selection(4, 4),
            Err(BoundViolation::TooManyOptions { max: 3 })
        );
    }

    #[test]
    fn test_definition_deserializes_with_defaults() {
        let json = r#"{"id":"wrap","name":"Wrap","price":330}"#;
        let item: ItemDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(item.price, Money::from_cents(330));
        assert_eq!(item.stock_unit, 1);
        assert!(!item.shareable);
    }
}
