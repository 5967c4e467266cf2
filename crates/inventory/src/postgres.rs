use async_trait::async_trait;
use common::{IngredientGroupId, ItemId, Money, StockId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Catalog, IngredientGroupDefinition, IngredientGroupRef, InventoryError, ItemDefinition,
    Result, StockDeduction, StockLedger, merge_deductions,
};

/// PostgreSQL-backed catalog.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Creates a new PostgreSQL catalog.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts or replaces an item definition together with its group links.
    pub async fn upsert_item(&self, item: &ItemDefinition) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO items (id, name, price_cents, max_quantity, stock_id, stock_unit, shareable)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                max_quantity = EXCLUDED.max_quantity,
                stock_id = EXCLUDED.stock_id,
                stock_unit = EXCLUDED.stock_unit,
                shareable = EXCLUDED.shareable
            "#,
        )
        .bind(item.id.as_str())
        .bind(&item.name)
        .bind(item.price.cents())
        .bind(item.max_quantity.map(|max| max as i32))
        .bind(item.stock_id.as_ref().map(StockId::as_str))
        .bind(item.stock_unit as i32)
        .bind(item.shareable)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM item_ingredient_groups WHERE item_id = $1")
            .bind(item.id.as_str())
            .execute(&mut *tx)
            .await?;

        for (position, group) in item.groups.iter().enumerate() {
            sqlx::query(
                "INSERT INTO item_ingredient_groups (item_id, group_id, position) VALUES ($1, $2, $3)",
            )
            .bind(item.id.as_str())
            .bind(group.id.as_str())
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Inserts or replaces an ingredient group after validating its bounds.
    pub async fn upsert_group(&self, group: &IngredientGroupDefinition) -> Result<()> {
        group.validate()?;

        sqlx::query(
            r#"
            INSERT INTO ingredient_groups (id, name, min_option, max_option, min_item, max_item)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                min_option = EXCLUDED.min_option,
                max_option = EXCLUDED.max_option,
                min_item = EXCLUDED.min_item,
                max_item = EXCLUDED.max_item
            "#,
        )
        .bind(group.id.as_str())
        .bind(&group.name)
        .bind(group.min_option.map(|v| v as i32))
        .bind(group.max_option.map(|v| v as i32))
        .bind(group.min_item.map(|v| v as i32))
        .bind(group.max_item.map(|v| v as i32))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_group(row: PgRow) -> Result<IngredientGroupDefinition> {
        let bound = |column: &str| -> Result<Option<u32>> {
            Ok(row.try_get::<Option<i32>, _>(column)?.map(|v| v as u32))
        };

        Ok(IngredientGroupDefinition {
            id: IngredientGroupId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            min_option: bound("min_option")?,
            max_option: bound("max_option")?,
            min_item: bound("min_item")?,
            max_item: bound("max_item")?,
        })
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<ItemDefinition>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, price_cents, max_quantity, stock_id, stock_unit, shareable
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(item_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let group_rows = sqlx::query(
            r#"
            SELECT g.id, g.name
            FROM item_ingredient_groups l
            JOIN ingredient_groups g ON g.id = l.group_id
            WHERE l.item_id = $1
            ORDER BY l.position ASC
            "#,
        )
        .bind(item_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let groups = group_rows
            .into_iter()
            .map(|g| -> Result<IngredientGroupRef> {
                Ok(IngredientGroupRef {
                    id: IngredientGroupId::new(g.try_get::<String, _>("id")?),
                    name: g.try_get("name")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(ItemDefinition {
            id: ItemId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            max_quantity: row
                .try_get::<Option<i32>, _>("max_quantity")?
                .map(|v| v as u32),
            stock_id: row.try_get::<Option<String>, _>("stock_id")?.map(StockId::new),
            stock_unit: row.try_get::<i32, _>("stock_unit")? as u32,
            shareable: row.try_get("shareable")?,
            groups,
        }))
    }

    async fn get_ingredient_group(
        &self,
        group_id: &IngredientGroupId,
    ) -> Result<Option<IngredientGroupDefinition>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, min_option, max_option, min_item, max_item
            FROM ingredient_groups
            WHERE id = $1
            "#,
        )
        .bind(group_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_group).transpose()
    }
}

/// PostgreSQL-backed stock ledger.
///
/// Decrements are single conditional `UPDATE`s, so the floor check and the
/// write happen atomically inside the database.
#[derive(Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
}

impl PostgresStockLedger {
    /// Creates a new PostgreSQL stock ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates or overwrites a stock record.
    pub async fn set_amount(&self, stock_id: &StockId, name: &str, amount: u64) -> Result<()> {
        let db_amount = i64::try_from(amount).map_err(|_| InventoryError::StockOverflow {
            stock_id: stock_id.clone(),
            amount,
            available: 0,
        })?;

        sqlx::query(
            r#"
            INSERT INTO stock (id, name, amount) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, amount = EXCLUDED.amount
            "#,
        )
        .bind(stock_id.as_str())
        .bind(name)
        .bind(db_amount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Explains why a conditional decrement touched no row.
    async fn shortage(
        tx: &mut Transaction<'_, Postgres>,
        stock_id: &StockId,
        requested: u64,
    ) -> InventoryError {
        let available: std::result::Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT amount FROM stock WHERE id = $1")
                .bind(stock_id.as_str())
                .fetch_optional(&mut **tx)
                .await;

        match available {
            Ok(Some(available)) => InventoryError::InsufficientStock {
                stock_id: stock_id.clone(),
                requested,
                available: available as u64,
            },
            Ok(None) => InventoryError::StockNotFound(stock_id.clone()),
            Err(e) => InventoryError::Database(e),
        }
    }

    async fn decrease_in(
        tx: &mut Transaction<'_, Postgres>,
        stock_id: &StockId,
        amount: u64,
    ) -> Result<()> {
        // No BIGINT record can cover an amount above i64::MAX.
        let Ok(db_amount) = i64::try_from(amount) else {
            return Err(Self::shortage(tx, stock_id, amount).await);
        };

        let result =
            sqlx::query("UPDATE stock SET amount = amount - $2 WHERE id = $1 AND amount >= $2")
                .bind(stock_id.as_str())
                .bind(db_amount)
                .execute(&mut **tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(Self::shortage(tx, stock_id, amount).await);
        }
        Ok(())
    }
}

#[async_trait]
impl StockLedger for PostgresStockLedger {
    async fn amount(&self, stock_id: &StockId) -> Result<u64> {
        let amount: Option<i64> = sqlx::query_scalar("SELECT amount FROM stock WHERE id = $1")
            .bind(stock_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        amount
            .map(|a| a as u64)
            .ok_or_else(|| InventoryError::StockNotFound(stock_id.clone()))
    }

    async fn try_decrease(&self, stock_id: &StockId, amount: u64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::decrease_in(&mut tx, stock_id, amount).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn increase(&self, stock_id: &StockId, amount: u64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let available: Option<i64> =
            sqlx::query_scalar("SELECT amount FROM stock WHERE id = $1 FOR UPDATE")
                .bind(stock_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let available = available.ok_or_else(|| InventoryError::StockNotFound(stock_id.clone()))?;

        let total = i64::try_from(amount)
            .ok()
            .and_then(|amount| available.checked_add(amount))
            .ok_or_else(|| InventoryError::StockOverflow {
                stock_id: stock_id.clone(),
                amount,
                available: available as u64,
            })?;

        sqlx::query("UPDATE stock SET amount = $2 WHERE id = $1")
            .bind(stock_id.as_str())
            .bind(total)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply_deductions(&self, deductions: &[StockDeduction]) -> Result<()> {
        let merged = merge_deductions(deductions);
        if merged.is_empty() {
            return Ok(());
        }

        // Rows are locked in stock-id order; dropping the transaction on
        // error rolls back every earlier decrement of the batch.
        let mut tx = self.pool.begin().await?;
        for deduction in &merged {
            Self::decrease_in(&mut tx, &deduction.stock_id, deduction.amount).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
