use serde_json::Value;

use crate::error::GatewayError;

/// A single Hero-SMS reply, classified at the transport boundary.
/// Constructed once per provider call and consumed immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    Error { message: String, cloudflare: bool },
    Text(String),
    Json(Value),
}

const CLOUDFLARE_MARKERS: &[&str] = &[
    "Just a moment",
    "cf-challenge",
    "challenge-platform",
    "Enable JavaScript",
];

const ERROR_PREFIXES: &[&str] = &["ERROR", "BAD", "NO_", "BANNED", "ACCOUNT_INACTIVE"];

pub const CLOUDFLARE_RETRY_TEXT: &str =
    "Cloudflare protection detected. Please wait a moment and try again.";

pub fn is_cloudflare_challenge(body: &str) -> bool {
    CLOUDFLARE_MARKERS.iter().any(|m| body.contains(m))
}

/// Classify a raw provider body. The Cloudflare check runs first and wins
/// regardless of surrounding content; then strict JSON, then the provider's
/// text error tokens, then plain text. The transport hands every body over
/// as text (challenge pages arrive as HTML strings), so one scan covers
/// both the HTML and plain-text cases.
pub fn classify(body: &str) -> ProviderReply {
    if is_cloudflare_challenge(body) {
        return ProviderReply::Error {
            message: CLOUDFLARE_RETRY_TEXT.to_string(),
            cloudflare: true,
        };
    }

    let trimmed = body.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return ProviderReply::Json(value);
        }
        // Not valid JSON after all, fall through as plain text
    }

    if ERROR_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return ProviderReply::Error {
            message: trimmed.to_string(),
            cloudflare: false,
        };
    }

    ProviderReply::Text(trimmed.to_string())
}

impl ProviderReply {
    /// Map the error variant into the gateway taxonomy, passing success
    /// replies through for parsing.
    pub fn into_result(self) -> Result<ProviderReply, GatewayError> {
        match self {
            ProviderReply::Error { message, cloudflare } => {
                if cloudflare {
                    Err(GatewayError::ProviderProtected(message))
                } else {
                    Err(GatewayError::ProviderError(message))
                }
            }
            other => Ok(other),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ProviderReply::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ProviderReply::Json(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloudflare_marker_anywhere_wins() {
        let body = r#"{"balance": 5} Just a moment..."#;
        match classify(body) {
            ProviderReply::Error { cloudflare, .. } => assert!(cloudflare),
            other => panic!("expected cloudflare error, got {:?}", other),
        }

        let html = "<html><title>Just a moment</title></html>";
        match classify(html) {
            ProviderReply::Error { cloudflare, .. } => assert!(cloudflare),
            other => panic!("expected cloudflare error, got {:?}", other),
        }
    }

    #[test]
    fn strict_json_bodies_classify_as_json() {
        match classify(r#"  {"balance": 12.5} "#) {
            ProviderReply::Json(v) => assert_eq!(v["balance"], 12.5),
            other => panic!("expected json, got {:?}", other),
        }

        match classify("[1, 2, 3]") {
            ProviderReply::Json(v) => assert!(v.is_array()),
            other => panic!("expected json, got {:?}", other),
        }
    }

    #[test]
    fn malformed_json_falls_back_to_text() {
        match classify("{not json at all") {
            ProviderReply::Text(s) => assert_eq!(s, "{not json at all"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn error_tokens_classify_as_provider_errors() {
        for body in [
            "ERROR_SQL",
            "BAD_ACTION",
            "NO_NUMBERS",
            "BANNED:2026-01-01",
            "ACCOUNT_INACTIVE",
        ] {
            match classify(body) {
                ProviderReply::Error { message, cloudflare } => {
                    assert_eq!(message, body);
                    assert!(!cloudflare);
                }
                other => panic!("expected error for {}, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn plain_replies_stay_text() {
        match classify("ACCESS_BALANCE:12.50\n") {
            ProviderReply::Text(s) => assert_eq!(s, "ACCESS_BALANCE:12.50"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn into_result_maps_the_taxonomy() {
        let protected = ProviderReply::Error {
            message: "cf".into(),
            cloudflare: true,
        };
        assert!(matches!(
            protected.into_result(),
            Err(GatewayError::ProviderProtected(_))
        ));

        let domain = ProviderReply::Error {
            message: "NO_NUMBERS".into(),
            cloudflare: false,
        };
        assert!(matches!(
            domain.into_result(),
            Err(GatewayError::ProviderError(_))
        ));

        assert!(ProviderReply::Text("ok".into()).into_result().is_ok());
    }
}
