use serde::Deserialize;

use crate::error::GatewayError;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Port the API server listens on (default 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Hero-SMS API key. Endpoints return errors when missing.
    pub hero_sms_api_key: Option<String>,

    /// Hero-SMS handler endpoint
    #[serde(default = "default_hero_sms_api_url")]
    pub hero_sms_api_url: String,

    /// Per provider call timeout in ms
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Overall per-request timeout applied by the HTTP layer, in ms
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Directory where per-user wallet files live
    #[serde(default = "default_wallets_dir")]
    pub wallets_dir: String,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Telegram bot token, required only by the bot binary
    pub bot_token: Option<String>,

    /// URL the bot's inline keyboard opens as the Mini App
    #[serde(default = "default_mini_app_url")]
    pub mini_app_url: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();

        let cfg: AppConfig = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(cfg)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.hero_sms_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_port() -> u16 {
    3000
}

fn default_hero_sms_api_url() -> String {
    "https://hero-sms.com/stubs/handler_api.php".to_string()
}

fn default_provider_timeout_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_wallets_dir() -> String {
    "@wallets".to_string()
}

fn default_database_url() -> String {
    "sqlite://dateev.db?mode=rwc".to_string()
}

fn default_mini_app_url() -> String {
    "http://localhost:3000".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let cfg: AppConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.provider_timeout_ms, 30_000);
        assert!(cfg.hero_sms_api_url.contains("hero-sms.com"));
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let cfg: AppConfig =
            serde_json::from_value(serde_json::json!({ "hero_sms_api_key": "  " })).unwrap();
        assert!(cfg.api_key().is_none());

        let cfg: AppConfig =
            serde_json::from_value(serde_json::json!({ "hero_sms_api_key": "k" })).unwrap();
        assert_eq!(cfg.api_key(), Some("k"));
    }
}
