//! Order aggregate implementation.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use common::{IngredientGroupId, ItemId, Money, OrderId, UserId};
use inventory::{IngredientGroupDefinition, ItemDefinition};
use order_store::{OrderRecord, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::{ItemNode, NodePath, NodeRef, OrderError, OrderStatus, OrderTree, UnfulfilledGroup};

/// Order aggregate root.
///
/// Holds the composition tree together with its running price and status.
/// Every mutation either succeeds completely or leaves the order as it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    id: OrderId,

    /// User who placed the order.
    user_id: Option<UserId>,

    /// Current status of the order.
    status: OrderStatus,

    /// Sum of every item node's price.
    price: Money,

    /// Selected items and their ingredient groups.
    tree: OrderTree,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    /// Stored version for optimistic concurrency.
    #[serde(default)]
    version: Version,
}

/// Pending selection for one ingredient group.
///
/// Obtained from [`Order::begin_fulfillment`]; items are added one by one
/// and the whole selection is attached by [`Order::fulfill_group`] only if
/// it satisfies the group's bounds.
#[derive(Debug, Clone)]
pub struct GroupSelection {
    path: NodePath,
    group_id: IngredientGroupId,
    group_name: String,
    coefficient: u64,
    children: Vec<ItemNode>,
}

impl GroupSelection {
    /// Path of the group being filled.
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Catalog id of the group being filled.
    pub fn group_id(&self) -> &IngredientGroupId {
        &self.group_id
    }

    /// Product of the quantities of every item above the group.
    pub fn coefficient(&self) -> u64 {
        self.coefficient
    }

    /// Selected nodes so far.
    pub fn children(&self) -> &[ItemNode] {
        &self.children
    }

    /// Adds `count` units of an item to the selection.
    ///
    /// A count of 0 means "not selected" and is skipped. `available` is the
    /// amount in the item's stock record, or `None` for untracked items.
    pub fn add(
        &mut self,
        item: &ItemDefinition,
        count: u32,
        available: Option<u64>,
    ) -> Result<(), OrderError> {
        if count == 0 {
            return Ok(());
        }

        check_quantity(item, count, self.coefficient, available)?;
        let nodes = ItemNode::build(item, count, self.coefficient)?;
        self.children.extend(nodes);
        Ok(())
    }

    fn distinct_options(&self) -> usize {
        self.children
            .iter()
            .filter(|node| node.num > 0)
            .map(|node| &node.id)
            .collect::<HashSet<_>>()
            .len()
    }

    fn total_items(&self) -> u64 {
        self.children.iter().map(|node| u64::from(node.num)).sum()
    }
}

/// Max-quantity check first, then the advisory stock check.
fn check_quantity(
    item: &ItemDefinition,
    quantity: u32,
    coefficient: u64,
    available: Option<u64>,
) -> Result<(), OrderError> {
    if item.exceeds_max_quantity(quantity)
        && let Some(max) = item.max_quantity
    {
        return Err(OrderError::QuantityExceedsMax {
            item: item.name.clone(),
            quantity,
            max,
        });
    }

    if let (Some(stock_id), Some(available)) = (&item.stock_id, available) {
        let requested = u64::from(quantity)
            .checked_mul(coefficient)
            .and_then(|units| item.stock_units(units))
            .ok_or_else(|| OrderError::QuantityOverflow {
                item: item.name.clone(),
                quantity: u64::from(quantity),
            })?;
        if requested > available {
            return Err(OrderError::InsufficientStock {
                stock_id: stock_id.clone(),
                requested,
                available,
            });
        }
    }

    Ok(())
}

// Query methods
impl Order {
    /// Creates a new empty order.
    pub fn new(user_id: Option<UserId>) -> Self {
        Self::with_id(OrderId::new(), user_id)
    }

    /// Creates a new empty order with a given id.
    pub fn with_id(id: OrderId, user_id: Option<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            status: OrderStatus::Created,
            price: Money::zero(),
            tree: OrderTree::new(),
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn tree(&self) -> &OrderTree {
        &self.tree
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Records the version written by the store.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Returns the first ingredient group still waiting for a selection.
    pub fn first_unfulfilled(&self) -> Option<UnfulfilledGroup> {
        self.tree.first_unfulfilled()
    }

    /// Returns true if every ingredient group has been fulfilled.
    pub fn is_complete(&self) -> bool {
        self.first_unfulfilled().is_none()
    }

    /// Renders the receipt text of the order.
    pub fn details(&self) -> String {
        format!("{}\n\nTotal price: {}", self.tree.render(), self.price)
    }
}

// Command methods
impl Order {
    fn ensure_status(&self, allowed: bool, action: &'static str) -> Result<(), OrderError> {
        if allowed {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                current: self.status,
                action,
            })
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Price of `nodes` and the order price once they are attached.
    fn price_after(&self, nodes: &[ItemNode]) -> Option<(Money, Money)> {
        let added = ItemNode::checked_total(nodes)?;
        Some((added, self.price.checked_add(added)?))
    }

    /// Checks what can be checked about a new root item before its
    /// definition is resolved.
    pub fn check_add_item(&self, quantity: u32) -> Result<(), OrderError> {
        self.ensure_status(self.status.can_modify(), "add item")?;
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        Ok(())
    }

    /// Adds `quantity` units of an item as new root nodes.
    ///
    /// Returns the price added to the order.
    pub fn add_root_item(
        &mut self,
        item: &ItemDefinition,
        quantity: u32,
        available: Option<u64>,
    ) -> Result<Money, OrderError> {
        self.check_add_item(quantity)?;
        check_quantity(item, quantity, 1, available)?;

        let nodes = ItemNode::build(item, quantity, 1)?;
        let (added, price) = self
            .price_after(&nodes)
            .ok_or_else(|| OrderError::QuantityOverflow {
                item: item.name.clone(),
                quantity: u64::from(quantity),
            })?;
        self.tree.push_roots(nodes);
        self.price = price;
        self.touch();
        Ok(added)
    }

    /// Starts filling the ingredient group at `path`.
    ///
    /// Checks, in order: status, pairing of ids and counts, path syntax,
    /// that the path addresses a group, and that the group is still empty.
    pub fn begin_fulfillment(
        &self,
        path: &str,
        item_count: usize,
        count_count: usize,
    ) -> Result<GroupSelection, OrderError> {
        self.ensure_status(self.status.can_modify(), "fulfill ingredient group")?;

        if item_count != count_count {
            return Err(OrderError::SelectionLengthMismatch {
                items: item_count,
                counts: count_count,
            });
        }

        let node_path: NodePath = path.parse()?;
        let Some((NodeRef::Group(group), coefficient)) = self.tree.resolve(&node_path) else {
            return Err(OrderError::PathNotFound {
                path: path.to_string(),
            });
        };

        if group.fulfilled {
            return Err(OrderError::AlreadyFulfilled {
                group: group.name.clone(),
                path: node_path,
            });
        }

        Ok(GroupSelection {
            group_id: group.id.clone(),
            group_name: group.name.clone(),
            path: node_path,
            coefficient,
            children: Vec::new(),
        })
    }

    /// Validates a selection against the group's bounds and attaches it.
    ///
    /// Returns the price added to the order.
    pub fn fulfill_group(
        &mut self,
        selection: GroupSelection,
        definition: &IngredientGroupDefinition,
    ) -> Result<Money, OrderError> {
        self.ensure_status(self.status.can_modify(), "fulfill ingredient group")?;

        definition
            .check_selection(selection.distinct_options(), selection.total_items())
            .map_err(|violation| OrderError::SelectionOutOfBounds {
                group: selection.group_name.clone(),
                violation,
            })?;

        let (added, price) = self
            .price_after(&selection.children)
            .ok_or_else(|| OrderError::QuantityOverflow {
                item: selection.group_name.clone(),
                quantity: selection.total_items(),
            })?;
        let group = self
            .tree
            .group_mut(&selection.path)
            .ok_or_else(|| OrderError::PathNotFound {
                path: selection.path.to_string(),
            })?;

        if group.fulfilled {
            return Err(OrderError::AlreadyFulfilled {
                group: group.name.clone(),
                path: selection.path,
            });
        }

        group.children = selection.children;
        group.fulfilled = true;
        self.price = price;
        self.touch();
        Ok(added)
    }

    /// Checks that the order can be paid and returns the units of each
    /// item it consumes.
    pub fn prepare_payment(&self) -> Result<BTreeMap<ItemId, u64>, OrderError> {
        self.ensure_status(self.status.can_pay(), "pay")?;

        if let Some(missing) = self.first_unfulfilled() {
            return Err(OrderError::IncompleteOrder { missing });
        }

        Ok(self.tree.consumption())
    }

    /// Moves the order to PAID. Stock must already have been deducted.
    pub fn mark_paid(&mut self) -> Result<(), OrderError> {
        self.ensure_status(self.status.can_pay(), "pay")?;
        self.status = OrderStatus::Paid;
        self.touch();
        Ok(())
    }

    /// Moves a paid order to READY.
    pub fn mark_ready(&mut self) -> Result<(), OrderError> {
        self.ensure_status(self.status.can_mark_ready(), "mark ready")?;
        self.status = OrderStatus::Ready;
        self.touch();
        Ok(())
    }
}

// Persistence
impl Order {
    /// Serializes the order for the store.
    pub fn to_record(&self) -> Result<OrderRecord, DomainError> {
        Ok(OrderRecord {
            id: self.id,
            user_id: self.user_id,
            status: self.status.as_str().to_string(),
            price_cents: self.price.cents(),
            content: serde_json::to_value(&self.tree)?,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    /// Rebuilds an order from a stored record.
    pub fn from_record(record: OrderRecord) -> Result<Self, DomainError> {
        let status = record
            .status
            .parse::<OrderStatus>()
            .map_err(|e| DomainError::InvalidRecord {
                order_id: record.id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            status,
            price: Money::from_cents(record.price_cents),
            tree: serde_json::from_value(record.content)?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        })
    }
}
