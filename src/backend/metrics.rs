use once_cell::sync::Lazy;
use prometheus::{Counter, Histogram, HistogramOpts, Registry, TextEncoder};

pub struct GatewayMetrics {
    pub provider_requests: Counter,
    pub provider_errors: Counter,
    pub cloudflare_challenges: Counter,
    pub parse_failures: Counter,
    pub request_duration: Histogram,
    registry: Registry,
}

impl GatewayMetrics {
    fn new() -> Self {
        let registry = Registry::new();

        let provider_requests = Counter::new(
            "smsgate_provider_requests_total",
            "Outbound Hero-SMS API calls",
        )
        .unwrap();
        let provider_errors = Counter::new(
            "smsgate_provider_errors_total",
            "Provider replies classified as errors",
        )
        .unwrap();
        let cloudflare_challenges = Counter::new(
            "smsgate_cloudflare_challenges_total",
            "Cloudflare challenge pages detected",
        )
        .unwrap();
        let parse_failures = Counter::new(
            "smsgate_parse_failures_total",
            "Replies that matched no known dialect",
        )
        .unwrap();
        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "smsgate_request_duration_seconds",
                "End-to-end gateway request duration",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .unwrap();

        registry
            .register(Box::new(provider_requests.clone()))
            .unwrap();
        registry.register(Box::new(provider_errors.clone())).unwrap();
        registry
            .register(Box::new(cloudflare_challenges.clone()))
            .unwrap();
        registry.register(Box::new(parse_failures.clone())).unwrap();
        registry
            .register(Box::new(request_duration.clone()))
            .unwrap();

        Self {
            provider_requests,
            provider_errors,
            cloudflare_challenges,
            parse_failures,
            request_duration,
            registry,
        }
    }

    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode_to_string(&families).unwrap_or_default()
    }
}

pub static METRICS: Lazy<GatewayMetrics> = Lazy::new(GatewayMetrics::new);

pub async fn metrics_handler() -> String {
    METRICS.encode()
}
