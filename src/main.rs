use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use nestor::{
    api::{build_app, AppState, SecurityMiddlewareConfig, SecurityState},
    config::{sanitize_for_logging, NestorConfig},
    database::{DatabasePool, MemoryStore, Store},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NestorConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check NESTOR_* environment variables.");
        e
    })?;

    init_logging(&config)?;

    info!("Starting Nestor rating service");

    let store = open_store(&config).await?;

    let state = AppState::new(
        store,
        &config.rating,
        config.security.admin_api_key.clone(),
    );
    info!(
        authority_weight = config.rating.authority_weight,
        publication_weight = config.rating.publication_weight,
        comment_weight = config.rating.comment_weight,
        sweep_roles = ?config.rating.sweep_roles,
        min_comment_voter_rating = config.rating.min_comment_voter_rating,
        "Rating core initialized"
    );

    let security_state = SecurityState::new(SecurityMiddlewareConfig::from(&config.security));
    spawn_rate_limiter_cleanup(security_state.clone());

    let app = build_app(state, security_state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Nestor listening on {}", bind_addr);
    info!(
        "Security middleware: Auth={}, Rate limit={}/min, Max body={}KB",
        config.security.enable_auth,
        config.security.rate_limit_per_minute,
        config.security.max_request_size / 1024
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_logging(config: &NestorConfig) -> Result<()> {
    let level = match config.logging.level.to_lowercase().as_str() {
        "error" => "error",
        "warn" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    };
    // RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

async fn open_store(config: &NestorConfig) -> Result<Arc<dyn Store>> {
    if !config.database.postgres_enabled {
        warn!("PostgreSQL disabled, using the in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    info!(
        url = %sanitize_for_logging(&config.database.postgres_url),
        max_connections = config.database.max_connections,
        "Connecting to PostgreSQL"
    );
    let pool = DatabasePool::new(
        &config.database.postgres_url,
        config.database.max_connections,
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    pool.init_schema()
        .await
        .context("Failed to initialize database schema")?;

    Ok(Arc::new(pool))
}

fn spawn_rate_limiter_cleanup(security: SecurityState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            security.rate_limiter.cleanup();
        }
    });
}
