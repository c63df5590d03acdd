//! Gatepass API Server
//!
//! Main entry point for the token authorization service.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatepass_api::{AppState, create_router};
use gatepass_core::token::{PolicyTable, SystemClock, TokenService};
use gatepass_db::{TokenRepository, connect};
use gatepass_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatepass=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    // An incomplete policy table is fatal.
    let policy = Arc::new(PolicyTable::standard()?);
    info!(
        level_3_threshold = %policy.level_3_threshold(),
        "Token policy registered"
    );

    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    let service = Arc::new(
        TokenService::new(
            Arc::new(TokenRepository::new(db)),
            Arc::new(SystemClock),
            policy,
        )
        .with_conflict_retries(config.workflow.conflict_retries),
    );

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let sweep = tokio::spawn(run_expiry_sweep(
        Arc::clone(&service),
        Duration::from_secs(config.workflow.expiry_sweep_interval_secs.max(1)),
    ));

    let state = AppState {
        service,
        jwt_service: Arc::new(jwt_service),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.abort();
    info!("Server stopped");
    Ok(())
}

/// Expires lapsed tokens on a fixed interval until the task is aborted.
async fn run_expiry_sweep(service: Arc<TokenService>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match service.sweep_expired().await {
            Ok(0) => debug!("Expiry sweep found nothing to expire"),
            Ok(count) => info!(count, "Expiry sweep expired tokens"),
            Err(e) => error!(error = %e, "Expiry sweep failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
