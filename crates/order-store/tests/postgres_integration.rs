//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need Docker.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::UserId;
use order_store::{
    OrderId, OrderQuery, OrderRecord, OrderRepository, PostgresOrderStore, SaveOptions,
    StoreError, Version,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresOrderStore::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared orders table
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn test_record(status: &str, user_id: Option<UserId>, age_secs: i64) -> OrderRecord {
    let at = Utc::now() - Duration::seconds(age_secs);
    OrderRecord {
        id: OrderId::new(),
        user_id,
        status: status.to_string(),
        price_cents: 500,
        content: serde_json::json!([{"id": "main", "name": "main", "num": 1, "price": 0, "children": []}]),
        version: Version::initial(),
        created_at: at,
        updated_at: at,
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn save_and_load_order() {
    let store = get_test_store().await;
    let record = test_record("created", Some(UserId::new()), 0);
    let id = record.id;

    let version = store
        .save(record.clone(), SaveOptions::expect_new())
        .await
        .unwrap();
    assert_eq!(version, Version::first());

    let loaded = store.load(id).await.unwrap().unwrap();
    assert_eq!(loaded.status, "created");
    assert_eq!(loaded.user_id, record.user_id);
    assert_eq!(loaded.content, record.content);
    assert_eq!(loaded.version, Version::first());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn update_bumps_version() {
    let store = get_test_store().await;
    let mut record = test_record("created", None, 0);

    store
        .save(record.clone(), SaveOptions::expect_new())
        .await
        .unwrap();

    record.status = "paid".to_string();
    let version = store
        .save(record.clone(), SaveOptions::expect_version(Version::first()))
        .await
        .unwrap();
    assert_eq!(version.as_i64(), 2);

    let loaded = store.load(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, "paid");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn stale_version_is_rejected() {
    let store = get_test_store().await;
    let record = test_record("created", None, 0);

    store
        .save(record.clone(), SaveOptions::expect_new())
        .await
        .unwrap();

    let result = store.save(record, SaveOptions::expect_new()).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn list_filters_and_pages() {
    let store = get_test_store().await;
    let user = UserId::new();

    let oldest = test_record("paid", Some(user), 120);
    let middle = test_record("created", Some(user), 60);
    let newest = test_record("paid", None, 0);
    let ids = [oldest.id, middle.id, newest.id];

    for record in [oldest, middle, newest] {
        store.save(record, SaveOptions::expect_new()).await.unwrap();
    }

    let all = store.list(OrderQuery::new()).await.unwrap();
    assert_eq!(
        all.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![ids[2], ids[1], ids[0]]
    );

    let mine = store.list(OrderQuery::for_user(user)).await.unwrap();
    assert_eq!(mine.len(), 2);

    let paid = store.list(OrderQuery::new().status("paid")).await.unwrap();
    assert_eq!(paid.len(), 2);

    let page = store
        .list(OrderQuery::new().offset(1).limit(1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, ids[1]);
}
