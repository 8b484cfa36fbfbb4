//! CoE Records API Gateway
//!
//! The entry point for all external API requests.
//! Handles:
//! - Caller authentication (bearer token or session cookie)
//! - Rate limiting and concurrency limits
//! - Routing to analytics, account report, custom report and record handlers
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;
#[cfg(test)]
mod tests;

use axum::{
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use coe_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{DbPool, MemoryStore, Repository, Store},
    metrics,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use middleware::rate_limit::RateLimit;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub jwt: Arc<JwtManager>,
    pub rate_limit: Option<Arc<RateLimit>>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn Store>, jwt: JwtManager) -> Self {
        let rate_limit = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimit::new(config.rate_limit.requests_per_second, config.rate_limit.burst)));

        Self {
            config,
            store,
            jwt: Arc::new(jwt),
            rate_limit,
        }
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config);
    info!(
        "Starting {} gateway v{}",
        config.observability.service_name,
        coe_common::VERSION
    );

    // Initialize metrics
    metrics::register_metrics();
    install_metrics_exporter(&config)?;

    let store = connect_store(&config).await?;
    let jwt = JwtManager::new(config.jwt_secret()?, config.auth.jwt_expiration_secs)
        .with_cookie_name(config.auth.token_cookie.clone());

    let state = AppState::new(config.clone(), store, jwt);
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let drain = Arc::new(Notify::new());
    let drain_started = drain.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain_started.notified().await })
            .await
    });

    tokio::select! {
        result = &mut server => return Ok(result??),
        _ = shutdown_signal() => drain.notify_one(),
    }

    // In-flight requests get `shutdown_timeout` to finish
    let deadline = config.shutdown_timeout();
    match tokio::time::timeout(deadline, server).await {
        Ok(result) => result??,
        Err(_) => warn!(
            timeout_secs = deadline.as_secs(),
            "Graceful shutdown timed out, dropping open connections"
        ),
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logging {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

fn install_metrics_exporter(config: &AppConfig) -> anyhow::Result<()> {
    let port = config.observability.metrics_port;
    if port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("aggregation_duration_seconds".to_string()),
            metrics::AGGREGATION_BUCKETS,
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Pick the store backend from `database.url`
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    if config.uses_memory_store() {
        warn!("Using the in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    info!("Connecting to database...");
    let pool = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        pool.migrate().await?;
    }

    Ok(Arc::new(Repository::new(pool)))
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Analytics endpoints
        .route("/analytics/data-usage", get(handlers::analytics::data_usage))
        .route(
            "/analytics/data-usage/table/{table_name}",
            get(handlers::analytics::table_usage),
        )
        .route(
            "/analytics/data-usage/user/{user_id}",
            get(handlers::analytics::user_usage),
        )
        // Account report endpoint
        .route("/auth/account-report", post(handlers::account::account_report))
        // Custom report endpoints
        .route(
            "/reports",
            get(handlers::reports::list_reports).post(handlers::reports::create_report),
        )
        .route(
            "/reports/{id}",
            get(handlers::reports::get_report)
                .put(handlers::reports::update_report)
                .delete(handlers::reports::delete_report),
        )
        // Record endpoints
        .route(
            "/records/{category}",
            get(handlers::records::list_records).post(handlers::records::create_record),
        )
        .route(
            "/records/{category}/{id}",
            get(handlers::records::get_record)
                .put(handlers::records::update_record)
                .delete(handlers::records::delete_record),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ));

    // Compose the app
    Router::new()
        // Health endpoints (no auth, no rate limit)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .layer(from_fn(middleware::request_metrics))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(ConcurrencyLimitLayer::new(state.config.server.max_concurrent_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
