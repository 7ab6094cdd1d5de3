use anyhow::{Context, Result};
use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

use playguard::api::{
    create_trust_router, create_validation_router, rate_limit_middleware,
    security_headers_middleware, SecurityState, TrustApiState, ValidationApiState,
};
use playguard::clock::{Clock, SystemClock};
use playguard::config::GuardConfig;
use playguard::store::{MemoryTrustStore, PgTrustStore, PlayerLocks, TrustStore};
use playguard::trust::TrustLedger;
use playguard::validation::{SaveValidator, ScoreValidator};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GuardConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    init_logging(&config)?;

    info!("Starting Playguard gameplay validation server");

    // Pick the trust store backend.
    let store: Arc<dyn TrustStore> = if config.database.postgres_enabled {
        let pg = PgTrustStore::connect(&config.database.postgres_url)
            .await
            .context("Failed to connect to PostgreSQL trust store")?;
        pg.init_schema()
            .await
            .context("Failed to initialize trust schema")?;
        Arc::new(pg)
    } else {
        warn!("PostgreSQL disabled - trust records are held in memory only");
        Arc::new(MemoryTrustStore::new())
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let locks = Arc::new(PlayerLocks::new());
    let schedule = config.tournament.schedule()?;

    let score_validator = Arc::new(ScoreValidator::new(
        store.clone(),
        clock.clone(),
        locks.clone(),
        schedule,
        config.score.to_limits(),
    ));
    let save_validator = Arc::new(SaveValidator::new(
        store.clone(),
        clock.clone(),
        locks.clone(),
        config.save.to_limits(),
    ));
    let ledger = Arc::new(TrustLedger::new(
        store,
        clock,
        locks,
        config.trust.to_policy(),
    ));
    info!(
        "Validators initialized: submit interval {}s, {} submits/window, auto-ban at {}",
        config.score.min_submit_interval_secs,
        config.score.max_submits_per_window,
        config.trust.auto_ban_threshold
    );

    let security_state = SecurityState::new(config.security.to_security());

    let app = Router::new()
        .nest(
            "/validate",
            create_validation_router(ValidationApiState {
                score: score_validator,
                save: save_validator,
            }),
        )
        .nest("/trust", create_trust_router(TrustApiState { ledger }))
        .route("/health", get(|| async { "OK" }))
        .layer(middleware::from_fn_with_state(
            security_state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!(
        "Playguard listening on {} (rate limit {}/min per IP)",
        bind_addr, config.security.rate_limit_per_minute
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_logging(config: &GuardConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
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
