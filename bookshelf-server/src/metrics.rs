//! Prometheus metrics for bookshelf
//!
//! One [`Metrics`] context is created at startup and shared by:
//! - the request middleware ([`track_requests`]), which times every request
//! - the handlers, which count backend failures per operation
//! - the scrape listener ([`router`]), which renders `/metrics`
//!
//! Route labels use the matched route template (`/books/{id}`), never the
//! raw path, so label cardinality stays bounded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bookshelf_core::Operation;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Route label for requests no route matched
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Latency buckets in seconds
const LATENCY_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    backend_errors: IntCounterVec,
}

impl Metrics {
    /// Create the instruments and register them with a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_request_total", "Total number of HTTP requests"),
            &["method", "route", "status_code"],
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency from receipt to response in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "route"],
        )?;

        let backend_errors = IntCounterVec::new(
            Opts::new(
                "backend_errors_total",
                "Storage backend failures by operation",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(backend_errors.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration,
            backend_errors,
        })
    }

    /// Count one finished request and observe its latency
    pub fn record_request(&self, method: &str, route: &str, status: StatusCode, elapsed: Duration) {
        let status = status.as_u16().to_string();
        match self
            .requests_total
            .get_metric_with_label_values(&[method, route, &status])
        {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::warn!(error = %e, "failed to record request count"),
        }
        match self
            .request_duration
            .get_metric_with_label_values(&[method, route])
        {
            Ok(histogram) => histogram.observe(elapsed.as_secs_f64()),
            Err(e) => tracing::warn!(error = %e, "failed to record request latency"),
        }
    }

    pub fn record_backend_error(&self, operation: Operation) {
        match self
            .backend_errors
            .get_metric_with_label_values(&[operation.as_str()])
        {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::warn!(error = %e, "failed to record backend error"),
        }
    }

    /// Encode every registered metric in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Middleware recording count and latency of every request, whatever its outcome
pub async fn track_requests(State(metrics): State<Metrics>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());

    let response = next.run(req).await;

    metrics.record_request(method.as_str(), &route, response.status(), started.elapsed());
    response
}

/// GET /metrics
async fn scrape(State(metrics): State<Metrics>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Router for the scrape listener
pub fn router(metrics: Metrics) -> Router {
    Router::new().route("/metrics", get(scrape)).with_state(metrics)
}
