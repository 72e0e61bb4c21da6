use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cost/availability for one (country, service) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub cost: f64,
    pub count: u32,
    #[serde(rename = "physicalCount")]
    pub physical_count: u32,
}

/// Outcome of resolving a quote inside a `getPrices` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceLookup {
    Quote(PriceQuote),
    /// Provider-side error shape `{status: "false", msg}` — the caller may
    /// retry once with the service code lower-cased before giving up.
    ProviderError(String),
    /// Payload was well-formed but held no entry for the pair; carries the
    /// service keys that were available for diagnostics.
    NotFound { available: Vec<String> },
    /// Payload was not an object at all.
    Unexpected,
}

/// The `{status: "false", msg}` error shape.
pub fn provider_error_message(payload: &Value) -> Option<String> {
    if payload.get("status").and_then(Value::as_str) == Some("false") {
        let msg = payload
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("Service is incorrect");
        return Some(msg.to_string());
    }
    None
}

fn quote_from_entry(entry: &Value) -> Option<PriceQuote> {
    if !entry.is_object() {
        return None;
    }
    Some(PriceQuote {
        cost: entry.get("cost").and_then(Value::as_f64).unwrap_or(0.0),
        count: entry
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        physical_count: entry
            .get("physicalCount")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
    })
}

fn service_entry<'a>(country_data: &'a Value, service: &str) -> Option<&'a Value> {
    // Exact key first, then case-insensitive across all service keys
    if let Some(entry) = country_data.get(service) {
        return Some(entry);
    }
    let map = country_data.as_object()?;
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(service))
        .map(|(_, entry)| entry)
}

/// Resolve one quote out of `{<countryId>: {<serviceCode>: {cost, count,
/// physicalCount}}}`. If the exact country key is absent, the first
/// available country key stands in; service keys match exact first, then
/// case-insensitively.
pub fn resolve_quote(payload: &Value, country_id: &str, service: &str) -> PriceLookup {
    if let Some(msg) = provider_error_message(payload) {
        return PriceLookup::ProviderError(msg);
    }

    let Some(map) = payload.as_object() else {
        return PriceLookup::Unexpected;
    };

    let country_data = match map.get(country_id) {
        Some(data) => data,
        None => {
            let fallback = map
                .iter()
                .find(|(key, _)| key.as_str() != "status" && key.as_str() != "msg")
                .map(|(_, data)| data);
            match fallback {
                Some(data) => data,
                None => return PriceLookup::NotFound { available: Vec::new() },
            }
        }
    };

    match service_entry(country_data, service).and_then(quote_from_entry) {
        Some(quote) => PriceLookup::Quote(quote),
        None => PriceLookup::NotFound {
            available: country_data
                .as_object()
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_match_resolves() {
        let payload = json!({"2": {"tg": {"cost": 2, "count": 0, "physicalCount": 0}}});
        match resolve_quote(&payload, "2", "tg") {
            PriceLookup::Quote(q) => {
                assert_eq!(q.cost, 2.0);
                assert_eq!(q.count, 0);
                assert_eq!(q.physical_count, 0);
            }
            other => panic!("expected quote, got {:?}", other),
        }
    }

    #[test]
    fn service_key_matches_case_insensitively() {
        let payload = json!({"2": {"TG": {"cost": 1.5, "count": 3, "physicalCount": 2}}});
        match resolve_quote(&payload, "2", "tg") {
            PriceLookup::Quote(q) => {
                assert_eq!(q.cost, 1.5);
                assert_eq!(q.count, 3);
            }
            other => panic!("expected quote via TG key, got {:?}", other),
        }
    }

    #[test]
    fn absent_country_falls_back_to_first_available() {
        let payload = json!({"7": {"tg": {"cost": 4, "count": 1, "physicalCount": 1}}});
        match resolve_quote(&payload, "2", "tg") {
            PriceLookup::Quote(q) => assert_eq!(q.cost, 4.0),
            other => panic!("expected fallback quote, got {:?}", other),
        }
    }

    #[test]
    fn status_false_shape_is_a_provider_error() {
        let payload = json!({"status": "false", "msg": "service is incorrect"});
        assert_eq!(
            resolve_quote(&payload, "2", "tg"),
            PriceLookup::ProviderError("service is incorrect".into())
        );

        let payload = json!({"status": "false"});
        assert_eq!(
            resolve_quote(&payload, "2", "tg"),
            PriceLookup::ProviderError("Service is incorrect".into())
        );
    }

    #[test]
    fn missing_service_reports_available_keys() {
        let payload = json!({"2": {"wa": {"cost": 1}}});
        match resolve_quote(&payload, "2", "tg") {
            PriceLookup::NotFound { available } => assert_eq!(available, vec!["wa"]),
            other => panic!("expected not-found, got {:?}", other),
        }
    }

    #[test]
    fn non_object_payload_is_unexpected() {
        assert_eq!(
            resolve_quote(&json!("ACCESS"), "2", "tg"),
            PriceLookup::Unexpected
        );
    }
}
