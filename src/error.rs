use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Per-request error taxonomy. Nothing here is fatal to the process;
/// every variant renders as a JSON body with an `error` field.
#[derive(Debug)]
pub enum GatewayError {
    /// Missing or malformed request parameters, raised before any provider call
    Validation(String),
    /// Provider bot-protection (Cloudflare challenge page) detected
    ProviderProtected(String),
    /// Provider answered with a recognized error token or error shape
    ProviderError(String),
    /// Reply did not match any known dialect
    ParseFailure(String),
    Config(String),
    WalletStore(std::io::Error),
    Database(sqlx::Error),
    Serde(serde_json::Error),
    Internal(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Validation(msg) => write!(f, "Validation error: {}", msg),
            GatewayError::ProviderProtected(msg) => write!(f, "Provider protected: {}", msg),
            GatewayError::ProviderError(msg) => write!(f, "Provider error: {}", msg),
            GatewayError::ParseFailure(msg) => write!(f, "Parse failure: {}", msg),
            GatewayError::Config(msg) => write!(f, "Config error: {}", msg),
            GatewayError::WalletStore(err) => write!(f, "Wallet store error: {}", err),
            GatewayError::Database(err) => write!(f, "Database error: {}", err),
            GatewayError::Serde(err) => write!(f, "Serde error: {}", err),
            GatewayError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let GatewayError::ProviderProtected(message) = &self {
            let body = Json(serde_json::json!({
                "error": message,
                "cloudflare": true,
                "retryAfter": 60,
            }));
            return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
        }

        let (status, message) = match &self {
            GatewayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::ProviderError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::ParseFailure(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            GatewayError::WalletStore(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            GatewayError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            GatewayError::Serde(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            GatewayError::ProviderProtected(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            GatewayError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        GatewayError::Database(err)
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::WalletStore(err)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serde(err)
    }
}
