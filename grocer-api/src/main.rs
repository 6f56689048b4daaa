//! # Grocer API Server
//!
//! Storefront backend: accounts, catalog, cart, addresses, cash-on-delivery
//! and card checkout with webhook-driven order creation.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p grocer-api
//! ```
//!
//! `LOG_FORMAT=json` switches to JSON logs; `RUST_LOG` overrides the filter.

use grocer_api::{
    app::{build_router, AppState},
    config::Config,
};
use grocer_shared::db::{
    migrations::{get_migration_status, run_migrations},
    pool::{close_pool, create_pool, get_pool_stats, DatabaseConfig},
};
use grocer_shared::mail::{LogMailer, Mailer, ResendMailer};
use grocer_shared::payments::{stripe::StripeClient, PaymentGateway};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "grocer_api=debug,grocer_shared=debug,tower_http=debug";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Grocer API starting");
    tracing::debug!(?config, "Configuration loaded");

    let mut db_config = DatabaseConfig::from_url(config.database.url.clone());
    db_config.max_connections = config.database.max_connections;
    let pool = create_pool(db_config).await?;

    run_migrations(&pool).await?;
    let status = get_migration_status(&pool).await?;
    tracing::info!(
        applied = status.applied_migrations,
        latest = ?status.latest_version,
        "Database migrations applied"
    );
    if !status.is_up_to_date() {
        tracing::warn!(
            applied = status.applied_migrations,
            known = status.known_migrations,
            "Not every embedded migration is applied"
        );
    }

    let stats = get_pool_stats(&pool);
    tracing::info!(
        total = stats.total_connections,
        idle = stats.idle_connections,
        "Database pool ready"
    );

    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.api_base.clone(),
    ));

    let mailer: Arc<dyn Mailer> = match &config.mail.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key.clone(), config.mail.from.clone())),
        None => {
            tracing::warn!("RESEND_API not set; mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config, gateway, mailer));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
