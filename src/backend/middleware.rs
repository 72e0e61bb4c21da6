use axum::{extract::Request, middleware::Next, response::Response};

use crate::backend::metrics::METRICS;

/// Observe end-to-end request duration for every route.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let timer = std::time::Instant::now();
    let response = next.run(req).await;
    METRICS
        .request_duration
        .observe(timer.elapsed().as_secs_f64());
    response
}
