//! Bazaar gateway - federated commerce tool server.
//!
//! Serves the tool surface over HTTP on port 3100.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - Provider capability records from a YAML file, cached with a TTL
//! - Provider adapters built once at startup from those records
//! - `PostgreSQL` for checkout sessions and orders when a database URL is
//!   configured, an in-memory store otherwise

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use bazaar_gateway::config::GatewayConfig;
use bazaar_gateway::db::{self, CheckoutStore, MemoryCheckoutStore, PgCheckoutStore};
use bazaar_gateway::middleware::request_id_middleware;
use bazaar_gateway::providers::ProviderDirectory;
use bazaar_gateway::registry::{CapabilityRegistry, CapabilitySource, YamlFileSource};
use bazaar_gateway::routes;
use bazaar_gateway::state::AppState;
use bazaar_gateway::tools::ToolRegistry;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &GatewayConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Pick the checkout store: `PostgreSQL` when configured, memory otherwise.
async fn checkout_store(config: &GatewayConfig) -> Arc<dyn CheckoutStore> {
    if let Some(url) = &config.database_url {
        let pool = db::create_pool(url)
            .await
            .expect("Failed to create database pool");
        tracing::info!("Database pool created");
        Arc::new(PgCheckoutStore::new(pool))
    } else {
        tracing::warn!("No database configured; checkout state is kept in memory");
        Arc::new(MemoryCheckoutStore::new())
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = GatewayConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_gateway=debug,tower_http=debug".into());

    // JSON logs when LOG_FORMAT=json, text otherwise
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    let json_layer =
        json_logs.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json_logs).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Provider records: adapters are built once, the registry re-reads on TTL
    let source = Arc::new(YamlFileSource::new(config.registry.providers_file.clone()));
    let records = source
        .load()
        .await
        .expect("Failed to load provider records");
    let providers = ProviderDirectory::from_records(&records)
        .await
        .expect("Failed to build provider adapters");
    tracing::info!(
        records = records.len(),
        adapters = providers.len(),
        "Providers loaded"
    );

    let registry = CapabilityRegistry::new(source, config.registry.ttl);
    let store = checkout_store(&config).await;

    let tools = ToolRegistry::new(
        config.search,
        config.checkout,
        Arc::new(registry),
        Arc::new(providers),
        store,
    );
    let state = AppState::new(config.clone(), tools);

    let app = Router::new()
        .merge(routes::routes())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &axum::http::Request<_>| {
                            tracing::info_span!(
                                "http_request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = tracing::field::Empty,
                                tool = tracing::field::Empty,
                                status = tracing::field::Empty,
                                latency_ms = tracing::field::Empty,
                            )
                        })
                        .on_response(
                            |response: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &Span| {
                                span.record("status", response.status().as_u16());
                                span.record(
                                    "latency_ms",
                                    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                                );
                                DefaultOnResponse::default().on_response(response, latency, span);
                            },
                        ),
                )
                // Request id runs inside the trace span so it can record on it
                .layer(axum::middleware::from_fn(request_id_middleware)),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("gateway listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
