use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use smsgate::{
    backend::{handlers::AppState, router::build_router},
    config::AppConfig,
    db::{create_pool, repository::Repository, run_migrations},
    provider::client::HeroSmsClient,
    wallet::store::WalletStore,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,smsgate=debug,tower_http=warn".into()),
        )
        .init();

    let cfg = AppConfig::load()?;

    if cfg.api_key().is_none() {
        warn!("HERO_SMS_API_KEY not set. API endpoints will return errors.");
    }

    let pool = create_pool(&cfg.database_url).await?;
    run_migrations(&pool).await?;

    let hero = HeroSmsClient::new(
        cfg.hero_sms_api_url.clone(),
        cfg.api_key().map(str::to_string),
        Duration::from_millis(cfg.provider_timeout_ms),
    );
    let repo = Repository::new(Arc::new(pool));
    let wallets = WalletStore::new(&cfg.wallets_dir);

    let addr = format!("0.0.0.0:{}", cfg.port);
    info!(
        api_url = %cfg.hero_sms_api_url,
        port = cfg.port,
        "smsgate server starting"
    );

    let state = Arc::new(AppState {
        cfg,
        hero,
        repo,
        wallets,
    });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Shutting down gracefully...");
    Ok(())
}
