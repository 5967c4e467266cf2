//! The order composition tree.
//!
//! An order is an ordered list of root [`ItemNode`]s. Each item node owns
//! one [`IngredientGroupNode`] per ingredient group of its definition, and
//! each group node owns the items the customer selected for it, so levels
//! strictly alternate item, group, item, ...
//!
//! The *coefficient* of a node is the product of the quantities of every
//! item node above it. It scales both the price and the stock consumption
//! of nested selections: choosing 3 patties inside a main ordered twice
//! consumes 6 patties.

use std::collections::BTreeMap;

use common::{IngredientGroupId, ItemId, Money};
use inventory::ItemDefinition;
use serde::{Deserialize, Serialize};

use super::{NodePath, OrderError};

/// Most nodes a single non-shareable selection may be split into.
pub const MAX_UNIT_NODES: u32 = 1_000;

/// A selected item inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemNode {
    pub id: ItemId,
    pub name: String,
    pub num: u32,
    /// Unit price × `num` × inherited coefficient.
    pub price: Money,
    pub children: Vec<IngredientGroupNode>,
}

/// An ingredient group of an item node, holding the customer's selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientGroupNode {
    pub id: IngredientGroupId,
    pub name: String,
    pub fulfilled: bool,
    pub children: Vec<ItemNode>,
}

/// Borrowed view of either kind of node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Item(&'a ItemNode),
    Group(&'a IngredientGroupNode),
}

/// The first ingredient group still waiting for a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfulfilledGroup {
    pub path: NodePath,
    /// Name of the item the group belongs to.
    pub item_name: String,
    pub group_id: IngredientGroupId,
}

impl ItemNode {
    /// Creates one node for `num` units of an item with empty ingredient groups.
    pub fn from_definition(
        item: &ItemDefinition,
        num: u32,
        coefficient: u64,
    ) -> Result<Self, OrderError> {
        let price = u64::from(num)
            .checked_mul(coefficient)
            .and_then(|factor| item.price.checked_mul(factor))
            .ok_or_else(|| OrderError::QuantityOverflow {
                item: item.name.clone(),
                quantity: u64::from(num),
            })?;

        Ok(Self {
            id: item.id.clone(),
            name: item.name.clone(),
            num,
            price,
            children: item
                .groups
                .iter()
                .map(|group| IngredientGroupNode::new(group.id.clone(), group.name.clone()))
                .collect(),
        })
    }

    /// Creates the nodes for a selection of `quantity` units.
    ///
    /// Shareable items collapse into a single node carrying the quantity;
    /// any other item gets one node per unit so that each unit's
    /// ingredient groups can be filled independently, at most
    /// [`MAX_UNIT_NODES`] of them.
    pub fn build(
        item: &ItemDefinition,
        quantity: u32,
        coefficient: u64,
    ) -> Result<Vec<Self>, OrderError> {
        if item.shareable {
            return Ok(vec![Self::from_definition(item, quantity, coefficient)?]);
        }

        if quantity > MAX_UNIT_NODES {
            return Err(OrderError::TooManyUnits {
                item: item.name.clone(),
                quantity,
                max: MAX_UNIT_NODES,
            });
        }
        let unit = Self::from_definition(item, 1, coefficient)?;
        Ok(vec![unit; quantity as usize])
    }

    /// Combined price of `nodes`, or `None` on overflow.
    pub fn checked_total(nodes: &[ItemNode]) -> Option<Money> {
        nodes
            .iter()
            .try_fold(Money::zero(), |total, node| total.checked_add(node.price))
    }

    /// Price of this node plus every selection below it.
    pub fn total_price(&self) -> Money {
        self.price
            + self
                .children
                .iter()
                .flat_map(|group| &group.children)
                .map(ItemNode::total_price)
                .sum::<Money>()
    }

    fn first_unfulfilled(&self, path: &NodePath) -> Option<UnfulfilledGroup> {
        self.children.iter().enumerate().find_map(|(index, group)| {
            let group_path = path.child(index);
            if !group.fulfilled {
                return Some(UnfulfilledGroup {
                    path: group_path,
                    item_name: self.name.clone(),
                    group_id: group.id.clone(),
                });
            }
            group
                .children
                .iter()
                .enumerate()
                .find_map(|(i, item)| item.first_unfulfilled(&group_path.child(i)))
        })
    }

    fn consume(&self, coefficient: u64, totals: &mut BTreeMap<ItemId, u64>) {
        let units = u64::from(self.num).saturating_mul(coefficient);
        let total = totals.entry(self.id.clone()).or_default();
        *total = total.saturating_add(units);

        for item in self.children.iter().flat_map(|group| &group.children) {
            item.consume(units, totals);
        }
    }

    fn render(&self, prefix: &str, out: &mut String) {
        out.push_str(prefix);
        out.push_str(&self.name);
        if self.num > 1 {
            out.push_str(&format!("*{}", self.num));
        }
        if !self.price.is_zero() {
            out.push_str(&format!(" ......{}", self.price));
        }
        out.push('\n');

        let indent = prefix.len() - prefix.trim_start().len() + 2;
        let child_prefix = " ".repeat(indent);
        for group in &self.children {
            group.render(&child_prefix, out);
        }
    }
}

impl IngredientGroupNode {
    /// Creates an unfulfilled group with no selections.
    pub fn new(id: IngredientGroupId, name: String) -> Self {
        Self {
            id,
            name,
            fulfilled: false,
            children: Vec::new(),
        }
    }

    fn render(&self, prefix: &str, out: &mut String) {
        let prefix = format!("{prefix}{}:", self.name);
        for item in &self.children {
            item.render(&prefix, out);
        }
    }
}

/// Ordered root items of an order.
///
/// Serializes as the bare array of root item records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderTree {
    roots: Vec<ItemNode>,
}

impl OrderTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[ItemNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Appends root items.
    pub fn push_roots(&mut self, nodes: Vec<ItemNode>) {
        self.roots.extend(nodes);
    }

    /// Sum of every reachable item node's price.
    pub fn total_price(&self) -> Money {
        self.roots.iter().map(ItemNode::total_price).sum()
    }

    /// Resolves a path to a node and the coefficient inherited from the
    /// item nodes above it.
    ///
    /// The coefficient saturates at `u64::MAX`, which no price or stock
    /// amount can be scaled by.
    pub fn resolve(&self, path: &NodePath) -> Option<(NodeRef<'_>, u64)> {
        let (&first, rest) = path.indices().split_first()?;
        let mut node = NodeRef::Item(self.roots.get(first)?);
        let mut coefficient = 1u64;

        for &index in rest {
            node = match node {
                NodeRef::Item(item) => {
                    coefficient = coefficient.saturating_mul(u64::from(item.num));
                    NodeRef::Group(item.children.get(index)?)
                }
                NodeRef::Group(group) => NodeRef::Item(group.children.get(index)?),
            };
        }

        Some((node, coefficient))
    }

    /// Mutable access to the group node at `path`.
    pub fn group_mut(&mut self, path: &NodePath) -> Option<&mut IngredientGroupNode> {
        if !path.points_to_group() {
            return None;
        }

        let indices = path.indices();
        let mut item = self.roots.get_mut(indices[0])?;
        let mut pairs = indices[1..].chunks(2).peekable();

        while let Some(pair) = pairs.next() {
            let group = item.children.get_mut(pair[0])?;
            if pairs.peek().is_none() {
                return Some(group);
            }
            item = group.children.get_mut(pair[1])?;
        }

        None
    }

    /// Finds the first unfulfilled group: roots left to right, then
    /// depth-first pre-order through groups and their selections.
    pub fn first_unfulfilled(&self) -> Option<UnfulfilledGroup> {
        self.roots
            .iter()
            .enumerate()
            .find_map(|(index, item)| item.first_unfulfilled(&NodePath::root(index)))
    }

    /// Units of each item consumed by the whole order.
    ///
    /// Every item node consumes `num × coefficient` units; the coefficient
    /// passed to its selections is multiplied by its `num`.
    pub fn consumption(&self) -> BTreeMap<ItemId, u64> {
        let mut totals = BTreeMap::new();
        for item in &self.roots {
            item.consume(1, &mut totals);
        }
        totals
    }

    /// Renders the receipt lines of every root item.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for item in &self.roots {
            item.render("", &mut out);
        }
        out
    }
}
