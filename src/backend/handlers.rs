use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    backend::metrics::METRICS,
    config::AppConfig,
    db::{self, repository::Repository},
    error::GatewayError,
    provider::{
        client::HeroSmsClient,
        parse::{self, NumberAllocation},
        price::{self, PriceLookup},
        reply::ProviderReply,
        status::{self, ActivationStatus},
    },
    wallet::store::WalletStore,
};

pub struct AppState {
    pub cfg: AppConfig,
    pub hero: HeroSmsClient,
    pub repo: Repository,
    pub wallets: WalletStore,
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Raw pass-through shape for endpoints whose payloads the frontend
/// consumes untouched.
fn reply_to_value(reply: ProviderReply) -> Value {
    match reply {
        ProviderReply::Json(v) => v,
        ProviderReply::Text(s) => Value::String(s),
        ProviderReply::Error { message, .. } => Value::String(message),
    }
}

fn parse_failure(msg: impl Into<String>) -> GatewayError {
    METRICS.parse_failures.inc();
    GatewayError::ParseFailure(msg.into())
}

// --- Provider catalogue ---

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = db::health_check(state.repo.pool()).await.is_ok();
    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "apiConfigured": state.cfg.api_key().is_some(),
        "apiUrl": state.cfg.hero_sms_api_url,
        "database": db_ok,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn get_balance(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let reply = state.hero.call("getBalance", &[]).await.into_result()?;

    match parse::parse_balance(&reply) {
        Some(balance) => Ok(Json(json!({ "balance": balance, "currency": "USD" }))),
        None => Err(parse_failure("Failed to parse balance response")),
    }
}

pub async fn get_countries(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let reply = state.hero.call("getCountries", &[]).await.into_result()?;

    let countries = parse::parse_countries(&reply);
    if countries.is_empty() {
        warn!("No countries found or invalid format");
        return Err(parse_failure(
            "Failed to load countries. Invalid response format.",
        ));
    }
    Ok(Json(json!({ "data": countries })))
}

#[derive(Debug, Deserialize)]
pub struct ServicesQuery {
    pub country: Option<String>,
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ServicesQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let mut params = Vec::new();
    if let Some(country) = &query.country {
        params.push(("country", country.clone()));
    }

    let reply = state
        .hero
        .call("getServicesList", &params)
        .await
        .into_result()?;

    let services = parse::dedup_services_by_id(parse::parse_services(&reply));
    Ok(Json(json!({ "data": services })))
}

fn reply_is_empty(reply: &ProviderReply) -> bool {
    match reply {
        ProviderReply::Error { .. } => true,
        ProviderReply::Text(s) => s.is_empty() || s == "BAD_ACTION" || s.starts_with("ERROR"),
        ProviderReply::Json(v) => {
            v.as_array().map(|a| a.is_empty()).unwrap_or(false)
                || v.as_object().map(|o| o.is_empty()).unwrap_or(false)
        }
    }
}

/// Services for one country. `getServicesList` is not available on every
/// account tier, so an empty or failed reply falls back to
/// `getNumbersStatus` for the same country.
pub async fn services_for_country(
    State(state): State<Arc<AppState>>,
    Path(country_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    info!(country = %country_id, "Fetching services");

    let mut reply = state
        .hero
        .call("getServicesList", &[("country", country_id.clone())])
        .await;

    if reply_is_empty(&reply) {
        info!(country = %country_id, "getServicesList empty, trying getNumbersStatus");
        reply = state
            .hero
            .call("getNumbersStatus", &[("country", country_id.clone())])
            .await;
    }

    let reply = reply.into_result()?;
    let services = parse::dedup_services_by_id(parse::parse_services(&reply));
    if services.is_empty() {
        warn!(country = %country_id, "No services parsed for country");
    }
    Ok(Json(json!({ "data": services })))
}

// --- Allocation ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentRequest {
    pub country_id: Option<Value>,
    pub hours: Option<u32>,
}

pub async fn rent_number(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RentRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let country_id = body
        .country_id
        .as_ref()
        .and_then(value_to_string)
        .ok_or_else(|| GatewayError::Validation("countryId is required".into()))?;
    let hours = body.hours.unwrap_or(24);

    let reply = state
        .hero
        .call(
            "rentNumber",
            &[("country", country_id.clone()), ("hours", hours.to_string())],
        )
        .await
        .into_result()?;

    let NumberAllocation { id, number } = parse::parse_number(&reply)
        .ok_or_else(|| parse_failure("Failed to parse number response"))?;

    Ok(Json(json!({
        "success": true,
        "id": id,
        "number": number,
        "country": country_id,
        "hours": hours,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    pub country_id: Option<Value>,
    pub service: Option<String>,
    pub use_v2: Option<bool>,
    pub max_price: Option<Value>,
}

pub async fn activate_number(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ActivateRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let country_id = body.country_id.as_ref().and_then(value_to_string);
    let (Some(country_id), Some(service)) = (country_id, body.service.clone()) else {
        return Err(GatewayError::Validation(
            "countryId and service are required".into(),
        ));
    };

    let action = if body.use_v2.unwrap_or(false) {
        "getNumberV2"
    } else {
        "getNumber"
    };

    let mut params = vec![("country", country_id.clone()), ("service", service.clone())];
    if let Some(max_price) = body.max_price.as_ref().and_then(value_to_string) {
        params.push(("maxPrice", max_price));
    }

    let reply = state.hero.call(action, &params).await.into_result()?;

    let allocation = parse::parse_number(&reply).ok_or_else(|| {
        let detail = reply
            .as_text()
            .map(str::to_string)
            .unwrap_or_else(|| "Failed to get number".to_string());
        parse_failure(detail)
    })?;

    Ok(Json(json!({
        "success": true,
        "id": allocation.id,
        "number": allocation.number,
        "country": country_id,
        "service": service,
    })))
}

// --- Pricing ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub country_id: Option<String>,
    pub service: Option<String>,
}

async fn fetch_price_payload(
    state: &AppState,
    country_id: &str,
    service: &str,
) -> Result<Value, GatewayError> {
    let reply = state
        .hero
        .call(
            "getPrices",
            &[
                ("country", country_id.to_string()),
                ("service", service.to_string()),
            ],
        )
        .await
        .into_result()?;

    match reply {
        ProviderReply::Json(v) => Ok(v),
        _ => Err(parse_failure("Invalid JSON response from API")),
    }
}

/// Price for one (country, service) pair. The provider expects the short
/// service code; when it rejects the given casing with `status:"false"`,
/// one retry with the code lower-cased happens in the same request.
pub async fn get_price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PriceQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let (Some(country_id), Some(service)) = (query.country_id.clone(), query.service.clone())
    else {
        return Err(GatewayError::Validation(
            "countryId and service are required".into(),
        ));
    };

    info!(country = %country_id, service = %service, "Fetching price");

    let mut service_used = service.clone();
    let mut payload = fetch_price_payload(&state, &country_id, &service_used).await?;

    if let Some(msg) = price::provider_error_message(&payload) {
        let lower = service_used.to_lowercase();
        if lower == service_used {
            return Err(GatewayError::ProviderError(msg));
        }

        info!(service = %lower, "Retrying price lookup with lowercase service code");
        let retry = fetch_price_payload(&state, &country_id, &lower).await?;
        if price::provider_error_message(&retry).is_some() {
            return Err(GatewayError::ProviderError(msg));
        }
        payload = retry;
        service_used = lower;
    }

    match price::resolve_quote(&payload, &country_id, &service_used) {
        PriceLookup::Quote(quote) => Ok(Json(json!({
            "success": true,
            "country": country_id,
            "service": service_used,
            "cost": quote.cost,
            "count": quote.count,
            "physicalCount": quote.physical_count,
        }))),
        PriceLookup::ProviderError(msg) => Err(GatewayError::ProviderError(msg)),
        PriceLookup::NotFound { available } => {
            warn!(
                country = %country_id,
                service = %service_used,
                available = ?available,
                "Service not found in price payload"
            );
            Err(GatewayError::ProviderError(
                "Service not found for this country".into(),
            ))
        }
        PriceLookup::Unexpected => {
            Err(parse_failure("Failed to parse price data - unexpected format"))
        }
    }
}

// --- Status / SMS ---

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub v2: Option<String>,
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(activation_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let action = if query.v2.as_deref() == Some("true") {
        "getStatusV2"
    } else {
        "getStatus"
    };

    let reply = state
        .hero
        .call(action, &[("id", activation_id)])
        .await
        .into_result()?;

    let body = match status::parse_status(&reply) {
        ActivationStatus::Ok { code } => json!({ "status": "OK", "code": code }),
        ActivationStatus::WaitCode => json!({ "status": "WAIT_CODE" }),
        ActivationStatus::Cancel => json!({ "status": "CANCEL" }),
        ActivationStatus::Other(s) => json!({ "status": s }),
        ActivationStatus::Json(v) => v,
    };
    Ok(Json(body))
}

pub async fn get_sms(
    State(state): State<Arc<AppState>>,
    Path(activation_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let reply = state
        .hero
        .call("getStatus", &[("id", activation_id)])
        .await
        .into_result()?;

    let body = match status::parse_status(&reply) {
        ActivationStatus::Ok { code } => json!({ "code": code, "status": "OK" }),
        ActivationStatus::WaitCode => json!({ "status": "WAIT_CODE", "code": null }),
        ActivationStatus::Cancel => json!({ "status": "CANCEL", "code": null }),
        ActivationStatus::Other(s) => json!({ "status": s, "code": null }),
        ActivationStatus::Json(v) => v,
    };
    Ok(Json(body))
}

/// Provider `setStatus` codes: 8 cancels an activation, 1 extends a rental.
pub async fn cancel_activation(
    State(state): State<Arc<AppState>>,
    Path(activation_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let reply = state
        .hero
        .call(
            "setStatus",
            &[("id", activation_id), ("status", "8".to_string())],
        )
        .await
        .into_result()?;

    if reply.as_text() == Some("ACCESS_CANCEL") {
        Ok(Json(json!({ "success": true, "message": "Activation cancelled" })))
    } else {
        Ok(Json(json!({
            "success": false,
            "message": reply_to_value(reply),
        })))
    }
}

// --- Rentals ---

pub async fn get_rented(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let reply = state.hero.call("getRentList", &[]).await;

    // An account with no rentals is not an error
    if let ProviderReply::Error { message, cloudflare: false } = &reply {
        if message == "NO_RENT" || message == "NO_NUMBERS" {
            return Ok(Json(json!({ "data": [] })));
        }
    }
    let reply = reply.into_result()?;

    let numbers: Value = match &reply {
        ProviderReply::Json(v) => {
            if v.is_array() {
                v.clone()
            } else if let Some(data) = v.get("data").filter(|d| d.is_array()) {
                data.clone()
            } else if let Some(rented) = v.get("rented").filter(|r| r.is_array()) {
                rented.clone()
            } else {
                json!([])
            }
        }
        ProviderReply::Text(s) => {
            // "id:number:service:time,..."
            let parsed: Vec<Value> = s
                .split(',')
                .filter_map(|part| {
                    let fields: Vec<&str> = part.split(':').collect();
                    let id = fields.first().filter(|f| !f.is_empty())?;
                    let number = fields.get(1).filter(|f| !f.is_empty())?;
                    Some(json!({
                        "id": id,
                        "number": number,
                        "service": fields.get(2).copied().unwrap_or("All"),
                        "time": fields.get(3).copied().unwrap_or("N/A"),
                        "expires": fields.get(3).copied(),
                    }))
                })
                .collect();
            Value::Array(parsed)
        }
        ProviderReply::Error { .. } => json!([]),
    };

    Ok(Json(json!({ "data": numbers })))
}

pub async fn get_rented_sms(
    State(state): State<Arc<AppState>>,
    Path(rent_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let reply = state
        .hero
        .call("getStatus", &[("id", rent_id)])
        .await
        .into_result()?;

    // V2 statuses are already structured
    match reply {
        ProviderReply::Json(v) => Ok(Json(v)),
        other => {
            let batch = status::parse_sms_batch(&other);
            Ok(Json(json!({ "data": batch.messages, "status": batch.status })))
        }
    }
}

pub async fn extend_rental(
    State(state): State<Arc<AppState>>,
    Path(rent_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let reply = state
        .hero
        .call("setStatus", &[("id", rent_id), ("status", "1".to_string())])
        .await
        .into_result()?;

    let extended = reply
        .as_text()
        .map(|s| s.contains("ACCESS") || s == "OK")
        .unwrap_or(false);
    let message = if extended {
        "Rental extended successfully".to_string()
    } else {
        reply
            .as_text()
            .unwrap_or("Failed to extend rental")
            .to_string()
    };

    Ok(Json(json!({
        "success": extended,
        "message": message,
        "data": reply_to_value(reply),
    })))
}

// --- Raw pass-through endpoints ---

async fn passthrough(
    state: &AppState,
    action: &str,
    params: &[(&str, String)],
) -> Result<Json<Value>, GatewayError> {
    let reply = state.hero.call(action, params).await.into_result()?;
    Ok(Json(json!({ "data": reply_to_value(reply) })))
}

pub async fn get_activations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    passthrough(&state, "getActiveActivations", &[]).await
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    passthrough(&state, "getHistory", &[]).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorsQuery {
    pub country_id: Option<String>,
}

pub async fn get_operators(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OperatorsQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let mut params = Vec::new();
    if let Some(country_id) = &query.country_id {
        params.push(("country", country_id.clone()));
    }
    passthrough(&state, "getOperators", &params).await
}

pub async fn get_prices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PriceQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let mut params = Vec::new();
    if let Some(country_id) = &query.country_id {
        params.push(("country", country_id.clone()));
    }
    if let Some(service) = &query.service {
        params.push(("service", service.clone()));
    }
    passthrough(&state, "getPrices", &params).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCountriesQuery {
    pub free_price: Option<String>,
}

pub async fn top_countries(
    State(state): State<Arc<AppState>>,
    Path(service): Path<String>,
    Query(query): Query<TopCountriesQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let mut params = vec![("service", service)];
    if query.free_price.as_deref() == Some("true") {
        params.push(("freePrice", "true".to_string()));
    }
    passthrough(&state, "getTopCountriesByService", &params).await
}

pub async fn top_countries_rank(
    State(state): State<Arc<AppState>>,
    Path(service): Path<String>,
    Query(query): Query<TopCountriesQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let mut params = vec![("service", service)];
    if query.free_price.as_deref() == Some("true") {
        params.push(("freePrice", "true".to_string()));
    }
    passthrough(&state, "getTopCountriesByServiceRank", &params).await
}

// --- Wallet & user ---

fn require_user_id(user_id: &str) -> Result<(), GatewayError> {
    if user_id.is_empty() || user_id == "undefined" {
        return Err(GatewayError::Validation("User ID is required".into()));
    }
    Ok(())
}

pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    require_user_id(&user_id)?;

    let user = state.repo.get_or_create_user(&user_id).await?;
    let (wallet, _) = state.wallets.load(&user_id).await?;

    // Ledger balance plus the wallet file's usdt balance; the on-chain
    // lookup lives outside this service.
    let usdt: f64 = wallet.usdt.balance.parse().unwrap_or(0.0);
    let total_balance = user.summ_dolar + usdt;

    Ok(Json(json!({
        "success": true,
        "wallet": wallet,
        "totalBalance": total_balance,
    })))
}

#[derive(Debug, Deserialize)]
pub struct WalletUpdateRequest {
    pub btc: Option<Value>,
    pub eth: Option<Value>,
    pub usdt: Option<Value>,
}

/// POST and PUT share this: load-or-create, overwrite the provided coin
/// balances, persist. Addresses and keys are never caller-writable.
pub async fn update_wallet(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(body): Json<WalletUpdateRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    require_user_id(&user_id)?;

    state.repo.get_or_create_user(&user_id).await?;
    let (mut wallet, _) = state.wallets.load(&user_id).await?;

    for (symbol, update) in [("btc", &body.btc), ("eth", &body.eth), ("usdt", &body.usdt)] {
        if let Some(balance) = update.as_ref().and_then(value_to_string) {
            if let Some(coin) = wallet.coin_mut(symbol) {
                coin.balance = balance;
            }
        }
    }

    state.wallets.save(&user_id, &wallet).await?;
    Ok(Json(json!({ "success": true, "wallet": wallet })))
}

pub async fn init_wallet(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    require_user_id(&user_id)?;

    state.repo.get_or_create_user(&user_id).await?;
    let (wallet, created) = state.wallets.load(&user_id).await?;

    info!(user = %user_id, created = created, "Wallet init");
    Ok(Json(json!({
        "success": true,
        "wallet": wallet,
        "created": created,
    })))
}

pub async fn init_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    require_user_id(&user_id)?;

    let user = state.repo.get_or_create_user(&user_id).await?;
    info!(user = %user_id, db_id = user.id, "User initialized");

    Ok(Json(json!({
        "success": true,
        "user": {
            "id": user.id,
            "idTelegram": user.id_telegram,
            "balance": user.summ_dolar,
        },
        "created": user.is_new(),
    })))
}
