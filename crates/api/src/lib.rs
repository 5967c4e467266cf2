//! HTTP API server with observability for the food-ordering system.
//!
//! Exposes the order-composition engine over REST, with structured
//! logging (tracing) and Prometheus metrics. Orders, catalog and stock
//! live either in memory or in PostgreSQL, selected by [`Backend`].

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::OrderService;
use inventory::{
    Catalog, InMemoryCatalog, InMemoryStockLedger, PostgresCatalog, PostgresStockLedger,
    StockLedger,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderRepository, PostgresOrderStore};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// A set of storage implementations the API can run on.
pub trait Backend: Send + Sync + 'static {
    /// Short name reported by the health endpoint.
    const NAME: &'static str;

    type Repository: OrderRepository + 'static;
    type Catalog: Catalog + 'static;
    type Ledger: StockLedger + 'static;
}

/// Everything in process memory; state is lost on restart.
pub struct InMemoryBackend;

impl Backend for InMemoryBackend {
    const NAME: &'static str = "memory";

    type Repository = InMemoryOrderStore;
    type Catalog = InMemoryCatalog;
    type Ledger = InMemoryStockLedger;
}

/// Orders, catalog and stock in PostgreSQL.
pub struct PostgresBackend;

impl Backend for PostgresBackend {
    const NAME: &'static str = "postgres";

    type Repository = PostgresOrderStore;
    type Catalog = PostgresCatalog;
    type Ledger = PostgresStockLedger;
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<B: Backend>(state: Arc<AppState<B>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<B>))
        .route("/orders", post(routes::orders::create::<B>))
        .route("/orders", get(routes::orders::list::<B>))
        .route("/orders/{id}", get(routes::orders::get::<B>))
        .route("/orders/{id}/items", post(routes::orders::add_item::<B>))
        .route(
            "/orders/{id}/groups/{path}",
            post(routes::orders::fulfill_group::<B>),
        )
        .route("/orders/{id}/details", get(routes::orders::details::<B>))
        .route(
            "/orders/{id}/unfulfilled",
            get(routes::orders::unfulfilled::<B>),
        )
        .route("/orders/{id}/pay", post(routes::orders::pay::<B>))
        .route("/orders/{id}/ready", post(routes::orders::ready::<B>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over in-memory stores.
///
/// The catalog and ledger handles share storage with the caller's copies,
/// so they can be seeded before or after the state is built.
pub fn create_in_memory_state(
    catalog: InMemoryCatalog,
    ledger: InMemoryStockLedger,
) -> Arc<AppState<InMemoryBackend>> {
    Arc::new(AppState {
        order_service: OrderService::new(InMemoryOrderStore::new(), catalog, ledger),
    })
}

/// Creates application state over PostgreSQL, applying pending migrations.
pub async fn create_postgres_state(
    pool: PgPool,
) -> Result<Arc<AppState<PostgresBackend>>, order_store::StoreError> {
    let repository = PostgresOrderStore::new(pool.clone());
    repository.run_migrations().await?;

    Ok(Arc::new(AppState {
        order_service: OrderService::new(
            repository,
            PostgresCatalog::new(pool.clone()),
            PostgresStockLedger::new(pool),
        ),
    }))
}
