//! Keygate server entry point.
//!
//! Wires configuration, stores, and services together, mounts the HTTP
//! routes, and runs the in-process sync scheduler.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use keygate::adapters::counter_store::RedisCounterStore;
use keygate::adapters::directory::HttpDirectory;
use keygate::adapters::http::{
    admission_routes, serial_routes, sync_routes, webhook_routes, AdmissionAppState,
    IssuanceAppState, SyncAppState,
};
use keygate::adapters::postgres::{
    PostgresDirectoryUserRepository, PostgresSerialRepository, PostgresSyncCursorRepository,
};
use keygate::application::{IssuanceService, RateLimitService, SyncEngine};
use keygate::config::AppConfig;
use keygate::domain::webhook::WebhookVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    config.validate()?;

    info!(
        environment = ?config.server.environment,
        "starting keygate"
    );

    // ── Stores ──────────────────────────────────────────────────────────

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_tokio_connection().await?;
    let counter_store = Arc::new(RedisCounterStore::new(redis_conn, config.redis.timeout()));

    // ── Services ────────────────────────────────────────────────────────

    let rate_limiter = Arc::new(RateLimitService::new(
        counter_store,
        config.limits.clone(),
    ));

    let issuance = Arc::new(IssuanceService::new(
        Arc::new(PostgresSerialRepository::new(pool.clone())),
        WebhookVerifier::new(config.issuance.webhook_secret.clone()),
    ));

    let directory = HttpDirectory::new(
        config.sync.directory_url.clone(),
        config.sync.directory_token.clone(),
        config.sync.page_size,
        config.sync.fetch_timeout(),
    )?;

    let engine = Arc::new(SyncEngine::new(
        Arc::new(directory),
        Arc::new(PostgresSyncCursorRepository::new(pool.clone())),
        Arc::new(PostgresDirectoryUserRepository::new(pool)),
        config.sync.clone(),
    ));

    // ── Scheduler ───────────────────────────────────────────────────────

    let scheduled_engine = engine.clone();
    let sync_interval = config.sync.interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sync_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup is quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match scheduled_engine.run(SyncEngine::USER_SYNC_JOB).await {
                Ok(outcome) => info!(?outcome, "scheduled sync run finished"),
                Err(e) => warn!(error = %e, "scheduled sync run did not complete"),
            }
        }
    });

    // ── Router ──────────────────────────────────────────────────────────

    let admission_state = AdmissionAppState { rate_limiter };
    let issuance_state = IssuanceAppState {
        issuance,
        issue_token: config.issuance.issue_token.clone(),
    };
    let sync_state = SyncAppState { engine };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest(
            "/api/admission",
            admission_routes().with_state(admission_state),
        )
        .nest(
            "/api/serials",
            serial_routes().with_state(issuance_state.clone()),
        )
        .nest(
            "/api/webhooks",
            webhook_routes().with_state(issuance_state),
        )
        .nest("/api/internal/sync", sync_routes().with_state(sync_state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = config.server.cors_origins_list();
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                error!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(parsed)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
