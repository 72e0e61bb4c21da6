use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::backend::metrics::METRICS;
use crate::provider::reply::{self, ProviderReply};

/// Browser-like headers so the provider's Cloudflare front does not flag
/// the gateway as a bare HTTP client.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

pub struct HeroSmsClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HeroSmsClient {
    pub fn new(api_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .expect("Failed to build Hero-SMS HTTP client");

        Self {
            client,
            api_url,
            api_key,
        }
    }

    /// Issue one provider action and classify whatever comes back.
    /// Never retries; error bodies and Cloudflare pages inside non-2xx
    /// responses are classified the same way as success bodies.
    pub async fn call(&self, action: &str, params: &[(&str, String)]) -> ProviderReply {
        let Some(api_key) = self.api_key.as_deref() else {
            return ProviderReply::Error {
                message: "API key not configured".to_string(),
                cloudflare: false,
            };
        };

        METRICS.provider_requests.inc();

        let mut query: Vec<(&str, String)> = vec![
            ("action", action.to_string()),
            ("api_key", api_key.to_string()),
        ];
        query.extend(params.iter().map(|(k, v)| (*k, v.clone())));

        let resp = self
            .client
            .get(&self.api_url)
            .query(&query)
            .header("User-Agent", USER_AGENT)
            .header("Accept", ACCEPT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Cache-Control", "max-age=0")
            .header("Referer", "https://hero-sms.com/")
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                warn!(action = %action, error = %e, "Hero-SMS API unreachable");
                return ProviderReply::Error {
                    message: e.to_string(),
                    cloudflare: false,
                };
            }
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!(action = %action, error = %e, "Failed to read Hero-SMS response body");
                return ProviderReply::Error {
                    message: e.to_string(),
                    cloudflare: false,
                };
            }
        };

        let classified = reply::classify(&body);
        debug!(action = %action, status = %status, "Hero-SMS reply classified");

        match classified {
            ProviderReply::Error { message, cloudflare } => {
                if cloudflare {
                    METRICS.cloudflare_challenges.inc();
                    warn!(action = %action, "Cloudflare challenge detected");
                } else {
                    METRICS.provider_errors.inc();
                }
                ProviderReply::Error { message, cloudflare }
            }
            other => {
                if !status.is_success() && !status.is_redirection() {
                    // Non-2xx with a body that matched no error dialect
                    METRICS.provider_errors.inc();
                    warn!(action = %action, status = %status, "Hero-SMS returned non-2xx");
                    return ProviderReply::Error {
                        message: format!("API request failed: HTTP {}", status.as_u16()),
                        cloudflare: false,
                    };
                }
                other
            }
        }
    }
}
