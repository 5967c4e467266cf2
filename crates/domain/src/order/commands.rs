//! Order commands.

use common::{ItemId, Money, OrderId, UserId};

use super::Order;

/// Command to create a new empty order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The order ID to create.
    pub order_id: OrderId,

    /// The user placing the order, if known.
    pub user_id: Option<UserId>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command with a generated order ID.
    pub fn new(user_id: Option<UserId>) -> Self {
        Self {
            order_id: OrderId::new(),
            user_id,
        }
    }

    /// Creates a new CreateOrder command for a user.
    pub fn for_user(user_id: UserId) -> Self {
        Self::new(Some(user_id))
    }

    /// Creates a new CreateOrder command without an owning user.
    pub fn anonymous() -> Self {
        Self::new(None)
    }
}

/// Command to add root items to an order.
#[derive(Debug, Clone)]
pub struct AddItem {
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub quantity: u32,
}

impl AddItem {
    /// Creates a new AddItem command.
    pub fn new(order_id: OrderId, item_id: impl Into<ItemId>, quantity: u32) -> Self {
        Self {
            order_id,
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// Command to fill an ingredient group of an order.
///
/// `item_ids` and `counts` are parallel lists; a count of 0 means the item
/// was offered but not selected.
#[derive(Debug, Clone)]
pub struct FulfillGroup {
    pub order_id: OrderId,
    /// Dotted path of the group node, e.g. `0.0`.
    pub path: String,
    pub item_ids: Vec<ItemId>,
    pub counts: Vec<u32>,
}

impl FulfillGroup {
    /// Creates a new FulfillGroup command from explicit lists.
    pub fn new(
        order_id: OrderId,
        path: impl Into<String>,
        item_ids: Vec<ItemId>,
        counts: Vec<u32>,
    ) -> Self {
        Self {
            order_id,
            path: path.into(),
            item_ids,
            counts,
        }
    }

    /// Creates a new FulfillGroup command from (item, count) pairs.
    pub fn with_selection<I, T>(order_id: OrderId, path: impl Into<String>, selection: I) -> Self
    where
        I: IntoIterator<Item = (T, u32)>,
        T: Into<ItemId>,
    {
        let (item_ids, counts) = selection
            .into_iter()
            .map(|(item, count)| (item.into(), count))
            .unzip();
        Self::new(order_id, path, item_ids, counts)
    }
}

/// Command to pay an order.
#[derive(Debug, Clone)]
pub struct PayOrder {
    pub order_id: OrderId,
}

impl PayOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

/// Command to mark a paid order as ready.
#[derive(Debug, Clone)]
pub struct MarkReady {
    pub order_id: OrderId,
}

impl MarkReady {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

/// Result of a command that adds to an order.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The order after the command was applied and saved.
    pub order: Order,

    /// Price added by the command.
    pub price_added: Money,
}
