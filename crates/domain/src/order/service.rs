//! Order service wiring the aggregate to its collaborators.

use common::{ItemId, OrderId};
use inventory::{Catalog, ItemDefinition, StockDeduction, StockLedger, merge_deductions};
use order_store::{OrderQuery, OrderRepository, SaveOptions};

use crate::error::DomainError;

use super::{
    AddItem, CommandResult, CreateOrder, FulfillGroup, MarkReady, Order, OrderError, PayOrder,
    UnfulfilledGroup,
};

/// Service for managing orders.
///
/// Each operation loads the order, resolves the catalog and stock data the
/// aggregate needs, runs the aggregate command and saves the result with an
/// optimistic version check.
pub struct OrderService<R, C, L>
where
    R: OrderRepository,
    C: Catalog,
    L: StockLedger,
{
    repository: R,
    catalog: C,
    ledger: L,
}

impl<R, C, L> OrderService<R, C, L>
where
    R: OrderRepository,
    C: Catalog,
    L: StockLedger,
{
    /// Creates a new order service.
    pub fn new(repository: R, catalog: C, ledger: L) -> Self {
        Self {
            repository,
            catalog,
            ledger,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Creates a new empty order.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        let mut order = Order::with_id(cmd.order_id, cmd.user_id);
        self.save(&mut order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id(), "order created");
        Ok(order)
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let record = self
            .repository
            .load(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;
        Order::from_record(record)
    }

    /// Lists orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>, DomainError> {
        self.repository
            .list(query)
            .await?
            .into_iter()
            .map(Order::from_record)
            .collect()
    }

    /// Adds root items to an order.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, cmd: AddItem) -> Result<CommandResult, DomainError> {
        let mut order = self.get_order(cmd.order_id).await?;
        order.check_add_item(cmd.quantity)?;

        let item = self.item(&cmd.item_id).await?;
        let available = self.available_stock(&item).await?;
        let price_added = order.add_root_item(&item, cmd.quantity, available)?;
        self.save(&mut order).await?;

        metrics::counter!("order_items_added_total").increment(u64::from(cmd.quantity));
        tracing::info!(
            order_id = %order.id(),
            item_id = %cmd.item_id,
            quantity = cmd.quantity,
            price_added = %price_added,
            "item added"
        );
        Ok(CommandResult { order, price_added })
    }

    /// Fills an ingredient group of an order.
    #[tracing::instrument(skip(self))]
    pub async fn fulfill_group(&self, cmd: FulfillGroup) -> Result<CommandResult, DomainError> {
        let mut order = self.get_order(cmd.order_id).await?;
        let mut selection =
            order.begin_fulfillment(&cmd.path, cmd.item_ids.len(), cmd.counts.len())?;

        let definition = self
            .catalog
            .get_ingredient_group(selection.group_id())
            .await
            .map_err(DomainError::from)?
            .ok_or_else(|| OrderError::IngredientGroupNotFound(selection.group_id().clone()))?;

        for (item_id, &count) in cmd.item_ids.iter().zip(&cmd.counts) {
            if count == 0 {
                continue;
            }
            let item = self.item(item_id).await?;
            let available = self.available_stock(&item).await?;
            selection.add(&item, count, available)?;
        }

        let price_added = order.fulfill_group(selection, &definition)?;
        self.save(&mut order).await?;

        metrics::counter!("ingredient_groups_fulfilled_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            path = %cmd.path,
            price_added = %price_added,
            "ingredient group fulfilled"
        );
        Ok(CommandResult { order, price_added })
    }

    /// Pays an order.
    ///
    /// Stock for the whole order is deducted as one all-or-nothing batch.
    /// If the paid order cannot be saved afterwards, the deductions are put
    /// back before the error is returned.
    #[tracing::instrument(skip(self))]
    pub async fn pay(&self, cmd: PayOrder) -> Result<Order, DomainError> {
        let result = self.try_pay(cmd.order_id).await;
        if result.is_err() {
            metrics::counter!("order_payment_failures_total").increment(1);
        }
        result
    }

    async fn try_pay(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let mut order = self.get_order(order_id).await?;
        let consumption = order.prepare_payment()?;

        let mut deductions = Vec::new();
        for (item_id, units) in consumption {
            let item = self.item(&item_id).await?;
            if let Some(stock_id) = &item.stock_id {
                let amount = item.stock_units(units).ok_or_else(|| {
                    OrderError::QuantityOverflow {
                        item: item.name.clone(),
                        quantity: units,
                    }
                })?;
                deductions.push(StockDeduction::new(stock_id.clone(), amount));
            }
        }
        let deductions = merge_deductions(&deductions);

        self.ledger.apply_deductions(&deductions).await?;

        order.mark_paid()?;
        if let Err(e) = self.save(&mut order).await {
            tracing::warn!(%order_id, error = %e, "failed to save paid order, restoring stock");
            self.restore_stock(&deductions).await;
            return Err(e);
        }

        let units = deductions
            .iter()
            .fold(0u64, |total, d| total.saturating_add(d.amount));
        metrics::counter!("orders_paid_total").increment(1);
        metrics::counter!("stock_units_deducted_total").increment(units);
        tracing::info!(%order_id, price = %order.price(), "order paid");
        Ok(order)
    }

    /// Marks a paid order as ready.
    #[tracing::instrument(skip(self))]
    pub async fn mark_ready(&self, cmd: MarkReady) -> Result<Order, DomainError> {
        let mut order = self.get_order(cmd.order_id).await?;
        order.mark_ready()?;
        self.save(&mut order).await?;

        tracing::info!(order_id = %order.id(), "order ready");
        Ok(order)
    }

    /// Returns the receipt text of an order.
    #[tracing::instrument(skip(self))]
    pub async fn details(&self, order_id: OrderId) -> Result<String, DomainError> {
        Ok(self.get_order(order_id).await?.details())
    }

    /// Returns the first ingredient group still waiting for a selection.
    #[tracing::instrument(skip(self))]
    pub async fn unfulfilled(
        &self,
        order_id: OrderId,
    ) -> Result<Option<UnfulfilledGroup>, DomainError> {
        Ok(self.get_order(order_id).await?.first_unfulfilled())
    }

    // Helpers

    async fn item(&self, item_id: &ItemId) -> Result<ItemDefinition, DomainError> {
        self.catalog
            .get_item(item_id)
            .await?
            .ok_or_else(|| OrderError::ItemNotFound(item_id.clone()).into())
    }

    async fn available_stock(&self, item: &ItemDefinition) -> Result<Option<u64>, DomainError> {
        match &item.stock_id {
            Some(stock_id) => Ok(Some(self.ledger.amount(stock_id).await?)),
            None => Ok(None),
        }
    }

    async fn save(&self, order: &mut Order) -> Result<(), DomainError> {
        let record = order.to_record()?;
        let version = self
            .repository
            .save(record, SaveOptions::expect_version(order.version()))
            .await?;
        order.set_version(version);
        Ok(())
    }

    async fn restore_stock(&self, deductions: &[StockDeduction]) {
        for deduction in deductions {
            if let Err(e) = self
                .ledger
                .increase(&deduction.stock_id, deduction.amount)
                .await
            {
                tracing::error!(
                    stock_id = %deduction.stock_id,
                    amount = deduction.amount,
                    error = %e,
                    "failed to restore stock"
                );
            }
        }
    }
}
