//! API server entry point.

use api::config::Config;
use api::seed::CatalogSeed;
use inventory::{InMemoryCatalog, InMemoryStockLedger};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Read the catalog seed, if any
    let seed = match &config.catalog_file {
        Some(path) => Some(
            CatalogSeed::from_file(path)
                .await
                .expect("failed to load catalog file"),
        ),
        None => None,
    };

    // 4. Build the application on the configured backend
    let app = match &config.database_url {
        Some(url) => {
            tracing::info!(max_connections = config.max_connections, "using PostgreSQL backend");
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let state = api::create_postgres_state(pool)
                .await
                .expect("failed to run migrations");
            if let Some(seed) = &seed {
                seed.load_postgres(state.order_service.catalog(), state.order_service.ledger())
                    .await
                    .expect("failed to seed catalog");
            }
            api::create_app(state, metrics_handle)
        }
        None => {
            tracing::info!("using in-memory backend");
            let catalog = InMemoryCatalog::new();
            let ledger = InMemoryStockLedger::new();
            if let Some(seed) = &seed {
                seed.load_in_memory(&catalog, &ledger)
                    .await
                    .expect("failed to seed catalog");
            }
            api::create_app(api::create_in_memory_state(catalog, ledger), metrics_handle)
        }
    };

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
