use async_trait::async_trait;
use common::UserId;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderId, OrderQuery, OrderRecord, Result, StoreError, Version,
    store::{OrderRepository, SaveOptions},
};

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<OrderRecord> {
        Ok(OrderRecord {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: row.try_get::<Option<Uuid>, _>("user_id")?.map(UserId::from),
            status: row.try_get("status")?,
            price_cents: row.try_get("price_cents")?,
            content: row.try_get("content")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderStore {
    async fn load(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, price_cents, content, version, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn save(&self, record: OrderRecord, options: SaveOptions) -> Result<Version> {
        let order_id = record.id;
        let mut tx = self.pool.begin().await?;

        // Lock the row (if any) so the version check and the write are atomic
        let current: Option<i64> =
            sqlx::query_scalar("SELECT version FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let current_version = current.map(Version::new).unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual: current_version,
            });
        }

        let new_version = current_version.next();

        if current.is_none() {
            sqlx::query(
                r#"
                INSERT INTO orders (id, user_id, status, price_cents, content, version, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(record.user_id.map(|u| u.as_uuid()))
            .bind(&record.status)
            .bind(record.price_cents)
            .bind(&record.content)
            .bind(new_version.as_i64())
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // Another writer inserted the same order first
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return StoreError::ConcurrencyConflict {
                        order_id,
                        expected: options.expected_version.unwrap_or(Version::initial()),
                        actual: Version::first(),
                    };
                }
                StoreError::Database(e)
            })?;
        } else {
            sqlx::query(
                r#"
                UPDATE orders
                SET user_id = $2, status = $3, price_cents = $4, content = $5,
                    version = $6, updated_at = $7
                WHERE id = $1
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(record.user_id.map(|u| u.as_uuid()))
            .bind(&record.status)
            .bind(record.price_cents)
            .bind(&record.content)
            .bind(new_version.as_i64())
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(%order_id, version = %new_version, "saved order");
        Ok(new_version)
    }

    async fn list(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let mut sql = String::from(
            "SELECT id, user_id, status, price_cents, content, version, created_at, updated_at FROM orders WHERE 1=1",
        );
        let mut param_count = 0;

        // Build dynamic query
        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(user_id) = query.user_id {
            sqlx_query = sqlx_query.bind(user_id.as_uuid());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }
}
