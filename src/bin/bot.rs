use anyhow::{Context, Result};
use smsgate::{bot::TelegramBot, config::AppConfig};
use tracing::info;
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
                .unwrap_or_else(|_| "info,smsgate=debug".into()),
        )
        .init();

    let cfg = AppConfig::load()?;
    let token = cfg
        .bot_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .context("BOT_TOKEN not set. Add BOT_TOKEN=your_bot_token to .env")?;

    info!(mini_app = %cfg.mini_app_url, "smsgate bot starting");

    let bot = TelegramBot::new(token, cfg.mini_app_url.clone());
    bot.run().await?;

    Ok(())
}
