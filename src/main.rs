//! NERIN payments server
//!
//! Loads configuration, selects the order store, wires the Mercado Pago
//! client and serves the order, webhook and operator routes.

use std::error::Error;
use std::sync::Arc;

use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use nerin_payments::adapters::http::{router, AppState};
use nerin_payments::adapters::{
    AtomicReconciliationMetrics, FileOrderStore, InMemoryOrderStore, LoggingEventPublisher,
    MercadoPagoClient, MercadoPagoSettings, PostgresOrderRepository,
};
use nerin_payments::application::handlers::order::CheckoutSettings;
use nerin_payments::config::{AppConfig, LogFormat, ServerConfig, StorageBackend, ValidationError};
use nerin_payments::domain::webhook::SignatureVerifier;
use nerin_payments::ports::OrderRepository;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        storage = ?config.storage.backend,
        "Starting NERIN payments"
    );

    let repository = build_repository(&config).await?;

    if !config.payment.has_access_token() {
        tracing::warn!("MP_ACCESS_TOKEN not set; provider lookups will fail and webhooks become no-ops");
    }
    let provider = Arc::new(MercadoPagoClient::new(MercadoPagoSettings::from_config(
        &config.payment,
    ))?);

    let verifier = SignatureVerifier::new(config.payment.webhook_secret.as_deref());
    if !verifier.is_enforcing() {
        tracing::warn!("Webhook secret not set; signatures are not verified");
    }

    let checkout = CheckoutSettings {
        public_url: config.payment.public_url.clone(),
        sandbox: config.payment.is_sandbox(),
        ..CheckoutSettings::default()
    };

    let state = AppState::new(
        repository,
        provider,
        Arc::new(LoggingEventPublisher::new()),
        Arc::new(AtomicReconciliationMetrics::new()),
        verifier,
        config.ops.clone(),
        checkout,
    );

    let app = router(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.clone()));

    match server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn build_repository(config: &AppConfig) -> Result<Arc<dyn OrderRepository>, Box<dyn Error>> {
    match config.storage.backend {
        StorageBackend::File => {
            tracing::info!(path = %config.storage.orders_file.display(), "Using file order store");
            Ok(Arc::new(FileOrderStore::new(&config.storage.orders_file)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory order store; orders are lost on restart");
            Ok(Arc::new(InMemoryOrderStore::new()))
        }
        StorageBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .ok_or(ValidationError::MissingRequired("DATABASE_URL"))?;
            let pool = PgPoolOptions::new()
                .min_connections(database.min_connections)
                .max_connections(database.max_connections)
                .acquire_timeout(database.acquire_timeout())
                .connect(&database.url)
                .await?;
            tracing::info!("Connected to PostgreSQL");

            if database.run_migrations {
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Migrations complete");
            }
            Ok(Arc::new(PostgresOrderRepository::new(pool)))
        }
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
