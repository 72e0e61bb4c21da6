use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::reply::ProviderReply;

/// One provider country. `id` is the provider's numeric identifier,
/// stringified; uniqueness is by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(rename = "retailPrice", skip_serializing_if = "Option::is_none")]
    pub retail_price: Option<f64>,
}

/// One provider service. `id` is always the provider's short code
/// (e.g. "tg"), never the display name, so price lookups stay
/// consistent across endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub count: u32,
    pub price: f64,
}

/// A freshly allocated number, one-time activation or rental alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberAllocation {
    pub id: String,
    pub number: String,
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_string(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(value_to_string)
}

fn field_f64(obj: &Value, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn field_u32(obj: &Value, key: &str) -> Option<u32> {
    match obj.get(key)? {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// `"ACCESS_BALANCE:<n>"`, `{balance: n}` or `{data: n}`.
pub fn parse_balance(reply: &ProviderReply) -> Option<f64> {
    match reply {
        ProviderReply::Error { .. } => None,
        ProviderReply::Json(v) => {
            if let Some(balance) = v.get("balance").and_then(Value::as_f64) {
                return Some(balance);
            }
            v.get("data").and_then(Value::as_f64)
        }
        ProviderReply::Text(s) => {
            let mut parts = s.splitn(2, ':');
            match (parts.next(), parts.next()) {
                (Some("ACCESS_BALANCE"), Some(rest)) => rest.parse().ok(),
                _ => None,
            }
        }
    }
}

fn country_from_object(entry: &Value) -> Option<Country> {
    let id = field_string(entry, "id")?;
    let name = field_string(entry, "name")
        .or_else(|| field_string(entry, "eng"))
        .or_else(|| field_string(entry, "rus"))
        .unwrap_or_else(|| format!("Country {}", id));
    let code = field_string(entry, "code")
        .or_else(|| field_string(entry, "iso"))
        .unwrap_or_else(|| id.clone());

    Some(Country {
        id,
        name,
        code,
        price: field_f64(entry, "price"),
        count: field_u32(entry, "count"),
        retail_price: field_f64(entry, "retailPrice")
            .or_else(|| field_f64(entry, "retail_price")),
    })
}

fn countries_from_array(items: &[Value]) -> Vec<Country> {
    items.iter().filter_map(country_from_object).collect()
}

/// `"id:name:code,..."`, an array of country objects, or an object keyed
/// by numeric id whose entries carry `{id, eng, rus, code, visible}`.
/// Entries with `visible == 0` are excluded.
pub fn parse_countries(reply: &ProviderReply) -> Vec<Country> {
    match reply {
        ProviderReply::Error { .. } => Vec::new(),
        ProviderReply::Json(v) => {
            if let Some(items) = v.as_array() {
                return countries_from_array(items);
            }

            if let Some(items) = v.get("countries").and_then(Value::as_array) {
                return countries_from_array(items);
            }
            if let Some(items) = v.get("data").and_then(Value::as_array) {
                return countries_from_array(items);
            }

            // Object keyed by numeric id, the format Hero-SMS actually returns
            let Some(map) = v.as_object() else {
                return Vec::new();
            };
            let keyed = map
                .values()
                .next()
                .map(|first| first.is_object() && first.get("id").is_some())
                .unwrap_or(false);
            if !keyed {
                return Vec::new();
            }

            map.values()
                .filter(|entry| entry.get("visible").and_then(Value::as_i64) != Some(0))
                .filter_map(country_from_object)
                .collect()
        }
        ProviderReply::Text(s) => s
            .split(',')
            .filter_map(|part| {
                let mut fields = part.split(':');
                let id = fields.next()?;
                let name = fields.next()?;
                let code = fields.next()?;
                if id.is_empty() || name.is_empty() || code.is_empty() {
                    return None;
                }
                Some(Country {
                    id: id.to_string(),
                    name: name.to_string(),
                    code: code.to_string(),
                    price: None,
                    count: None,
                    retail_price: None,
                })
            })
            .collect(),
    }
}

fn service_from_object(entry: &Value) -> Option<Service> {
    // Short code before display name, so the id survives price lookups
    let code = field_string(entry, "code");
    let id = code.clone().or_else(|| field_string(entry, "id"))?;
    let name = field_string(entry, "name")
        .or_else(|| code.clone())
        .unwrap_or_else(|| id.clone());

    Some(Service {
        id,
        name,
        code,
        count: field_u32(entry, "count").unwrap_or(0),
        price: field_f64(entry, "price").unwrap_or(0.0),
    })
}

fn services_from_array(items: &[Value]) -> Vec<Service> {
    items.iter().filter_map(service_from_object).collect()
}

/// `"code:count:price,..."`, an array of `{code, name, count, price}`,
/// or an object keyed by service name with `{count, price}` values.
pub fn parse_services(reply: &ProviderReply) -> Vec<Service> {
    match reply {
        ProviderReply::Error { .. } => Vec::new(),
        ProviderReply::Json(v) => {
            if let Some(items) = v.as_array() {
                return services_from_array(items);
            }

            if let Some(items) = v.get("services").and_then(Value::as_array) {
                return services_from_array(items);
            }
            if let Some(items) = v.get("data").and_then(Value::as_array) {
                return services_from_array(items);
            }

            let Some(map) = v.as_object() else {
                return Vec::new();
            };
            let mut services = Vec::new();
            for (key, entry) in map {
                if entry.is_object() {
                    if entry.get("count").is_some() || entry.get("price").is_some() {
                        services.push(Service {
                            id: key.clone(),
                            name: key.clone(),
                            code: None,
                            count: field_u32(entry, "count").unwrap_or(0),
                            price: field_f64(entry, "price").unwrap_or(0.0),
                        });
                    } else if entry.get("name").is_some() || entry.get("id").is_some() {
                        services.push(Service {
                            id: field_string(entry, "id").unwrap_or_else(|| key.clone()),
                            name: field_string(entry, "name").unwrap_or_else(|| key.clone()),
                            code: None,
                            count: field_u32(entry, "count").unwrap_or(0),
                            price: field_f64(entry, "price").unwrap_or(0.0),
                        });
                    }
                } else if let Some(price) = entry.as_f64() {
                    services.push(Service {
                        id: key.clone(),
                        name: key.clone(),
                        code: None,
                        count: 0,
                        price,
                    });
                }
            }
            services
        }
        ProviderReply::Text(s) => {
            if s == "NO_NUMBERS" || s == "BAD_ACTION" || s.starts_with("ERROR") {
                return Vec::new();
            }
            s.split(',')
                .filter_map(|part| {
                    let mut fields = part.split(':');
                    let code = fields.next()?;
                    let count = fields.next()?;
                    let price = fields.next()?;
                    if code.is_empty() {
                        return None;
                    }
                    Some(Service {
                        id: code.to_string(),
                        name: code.to_string(),
                        code: Some(code.to_string()),
                        count: count.parse().unwrap_or(0),
                        price: price.parse().unwrap_or(0.0),
                    })
                })
                .collect()
        }
    }
}

/// `"ACCESS_NUMBER:id:number"`, `"ACCESS_RENT:id:number"`,
/// `{id, number}` or `{data: {id, number}}`.
pub fn parse_number(reply: &ProviderReply) -> Option<NumberAllocation> {
    match reply {
        ProviderReply::Error { .. } => None,
        ProviderReply::Json(v) => {
            let direct = v
                .get("id")
                .and_then(value_to_string)
                .zip(v.get("number").and_then(value_to_string));
            if let Some((id, number)) = direct {
                return Some(NumberAllocation { id, number });
            }
            let data = v.get("data")?;
            let id = field_string(data, "id")?;
            let number = field_string(data, "number")?;
            Some(NumberAllocation { id, number })
        }
        ProviderReply::Text(s) => {
            let parts: Vec<&str> = s.split(':').collect();
            if parts.len() >= 3 && (parts[0] == "ACCESS_NUMBER" || parts[0] == "ACCESS_RENT") {
                Some(NumberAllocation {
                    id: parts[1].to_string(),
                    number: parts[2].to_string(),
                })
            } else {
                None
            }
        }
    }
}

/// The parsers may emit duplicate ids (e.g. when the services-list and
/// numbers-status calls both contribute); the consumer keeps the first
/// occurrence, preserving relative order.
pub fn dedup_services_by_id(services: Vec<Service>) -> Vec<Service> {
    let mut seen = std::collections::HashSet::new();
    services
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect()
}

/// Ascending by price for the price-comparison flow. Missing or zero
/// prices sort first.
pub fn sort_countries_by_price(countries: &mut [Country]) {
    countries.sort_by(|a, b| {
        a.price
            .unwrap_or(0.0)
            .total_cmp(&b.price.unwrap_or(0.0))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::reply::classify;
    use serde_json::json;

    #[test]
    fn balance_text_dialect_parses_exactly() {
        let reply = classify("ACCESS_BALANCE:123.45");
        assert_eq!(parse_balance(&reply), Some(123.45));
    }

    #[test]
    fn balance_json_dialects() {
        assert_eq!(
            parse_balance(&ProviderReply::Json(json!({"balance": 7.5}))),
            Some(7.5)
        );
        assert_eq!(
            parse_balance(&ProviderReply::Json(json!({"data": 3.0}))),
            Some(3.0)
        );
        assert_eq!(parse_balance(&ProviderReply::Text("whatever".into())), None);
    }

    #[test]
    fn countries_delimited_dialect() {
        let reply = ProviderReply::Text("0:Russia:RU,1:USA:US,2:Kazakhstan:KZ".into());
        let countries = parse_countries(&reply);
        assert_eq!(countries.len(), 3);
        assert_eq!(countries[1].id, "1");
        assert_eq!(countries[1].name, "USA");
        assert_eq!(countries[1].code, "US");
    }

    #[test]
    fn countries_keyed_object_excludes_invisible() {
        let reply = ProviderReply::Json(json!({
            "106": {"id": 106, "eng": "Swaziland", "rus": "Свазиленд", "visible": 1},
            "2": {"id": 2, "eng": "Kazakhstan", "code": "KZ", "visible": 0},
            "7": {"id": 7, "rus": "Абхазия", "visible": 1}
        }));
        let countries = parse_countries(&reply);
        let ids: Vec<&str> = countries.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"106"));
        assert!(ids.contains(&"7"));
        assert!(!ids.contains(&"2"), "visible == 0 must be excluded");

        let swaziland = countries.iter().find(|c| c.id == "106").unwrap();
        assert_eq!(swaziland.name, "Swaziland");
        assert_eq!(swaziland.code, "106"); // no code field, falls back to id

        let abkhazia = countries.iter().find(|c| c.id == "7").unwrap();
        assert_eq!(abkhazia.name, "Абхазия"); // rus fallback when eng is absent
    }

    #[test]
    fn countries_sorted_ascending_with_missing_price_first() {
        let mut countries = vec![
            Country {
                id: "1".into(),
                name: "A".into(),
                code: "A".into(),
                price: Some(2.0),
                count: None,
                retail_price: None,
            },
            Country {
                id: "2".into(),
                name: "B".into(),
                code: "B".into(),
                price: None,
                count: None,
                retail_price: None,
            },
            Country {
                id: "3".into(),
                name: "C".into(),
                code: "C".into(),
                price: Some(0.5),
                count: None,
                retail_price: None,
            },
        ];
        sort_countries_by_price(&mut countries);
        let ids: Vec<&str> = countries.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["2", "3", "1"]);
    }

    #[test]
    fn services_delimited_dialect() {
        let reply = ProviderReply::Text("tg:100:2.5,wa:0:1.75".into());
        let services = parse_services(&reply);
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].id, "tg");
        assert_eq!(services[0].count, 100);
        assert_eq!(services[1].price, 1.75);
    }

    #[test]
    fn services_error_tokens_yield_empty() {
        for body in ["NO_NUMBERS", "BAD_ACTION", "ERROR_SQL"] {
            let reply = ProviderReply::Text(body.into());
            assert!(parse_services(&reply).is_empty());
        }
    }

    #[test]
    fn services_array_prefers_short_code_as_id() {
        let reply = ProviderReply::Json(json!([
            {"code": "tg", "name": "Telegram", "count": 10, "price": 2.0},
            {"id": "Viber", "count": 5}
        ]));
        let services = parse_services(&reply);
        assert_eq!(services[0].id, "tg");
        assert_eq!(services[0].name, "Telegram");
        assert_eq!(services[1].id, "Viber");
        assert_eq!(services[1].price, 0.0);
    }

    #[test]
    fn services_keyed_object_dialects() {
        let reply = ProviderReply::Json(json!({
            "telegram": {"count": 100, "price": 5.0},
            "whatsapp": 1.25
        }));
        let mut services = parse_services(&reply);
        services.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].id, "telegram");
        assert_eq!(services[0].count, 100);
        assert_eq!(services[1].id, "whatsapp");
        assert_eq!(services[1].price, 1.25);
    }

    #[test]
    fn duplicate_service_ids_keep_first_occurrence() {
        let services = vec![
            Service {
                id: "tg".into(),
                name: "Telegram".into(),
                code: Some("tg".into()),
                count: 10,
                price: 2.0,
            },
            Service {
                id: "wa".into(),
                name: "WhatsApp".into(),
                code: None,
                count: 3,
                price: 1.0,
            },
            Service {
                id: "tg".into(),
                name: "tg".into(),
                code: None,
                count: 0,
                price: 9.0,
            },
        ];
        let deduped = dedup_services_by_id(services);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name, "Telegram");
        assert_eq!(deduped[1].id, "wa");
    }

    #[test]
    fn number_text_dialects() {
        let reply = classify("ACCESS_NUMBER:12345:79261234567");
        let n = parse_number(&reply).unwrap();
        assert_eq!(n.id, "12345");
        assert_eq!(n.number, "79261234567");

        let reply = classify("ACCESS_RENT:8:4915112345678");
        let n = parse_number(&reply).unwrap();
        assert_eq!(n.id, "8");

        assert!(parse_number(&ProviderReply::Text("ACCESS_NUMBER:1".into())).is_none());
    }

    #[test]
    fn number_json_dialects() {
        let n = parse_number(&ProviderReply::Json(json!({"id": 5, "number": "123"}))).unwrap();
        assert_eq!(n.id, "5");

        let n = parse_number(&ProviderReply::Json(
            json!({"data": {"id": "6", "number": 456}}),
        ))
        .unwrap();
        assert_eq!(n.id, "6");
        assert_eq!(n.number, "456");

        assert!(parse_number(&ProviderReply::Json(json!({"ok": true}))).is_none());
    }
}
