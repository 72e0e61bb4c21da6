use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware, routing};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::backend::{
    handlers::{
        AppState, activate_number, cancel_activation, extend_rental, get_activations,
        get_balance, get_countries, get_history, get_operators, get_price, get_prices,
        get_rented, get_rented_sms, get_sms, get_status, get_wallet, health, init_user,
        init_wallet, list_services, rent_number, services_for_country, top_countries,
        top_countries_rank, update_wallet,
    },
    metrics,
    middleware::track_metrics,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    let request_timeout = Duration::from_millis(state.cfg.request_timeout_ms);

    Router::new()
        .route("/api/health", routing::get(health))
        .route("/api/balance", routing::get(get_balance))
        .route("/api/countries", routing::get(get_countries))
        .route("/api/services", routing::get(list_services))
        .route("/api/services/:country_id", routing::get(services_for_country))
        .route("/api/rent", routing::post(rent_number))
        .route("/api/activate", routing::post(activate_number))
        .route("/api/price", routing::get(get_price))
        .route("/api/status/:activation_id", routing::get(get_status))
        .route("/api/sms/:activation_id", routing::get(get_sms))
        .route("/api/cancel/:activation_id", routing::post(cancel_activation))
        .route("/api/rented", routing::get(get_rented))
        .route("/api/rented/:rent_id/sms", routing::get(get_rented_sms))
        .route("/api/rented/:rent_id/extend", routing::post(extend_rental))
        .route("/api/activations", routing::get(get_activations))
        .route("/api/history", routing::get(get_history))
        .route("/api/operators", routing::get(get_operators))
        .route("/api/prices", routing::get(get_prices))
        .route("/api/top-countries/:service", routing::get(top_countries))
        .route(
            "/api/top-countries-rank/:service",
            routing::get(top_countries_rank),
        )
        .route(
            "/api/wallet/:user_id",
            routing::get(get_wallet)
                .post(update_wallet)
                .put(update_wallet),
        )
        .route("/api/wallet/:user_id/init", routing::post(init_wallet))
        .route("/api/user/init/:user_id", routing::post(init_user))
        .route("/metrics", routing::get(metrics::metrics_handler))
        .route_layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
