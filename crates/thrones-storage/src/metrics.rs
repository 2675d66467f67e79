//! Prometheus metrics export.
//!
//! # Metrics Exported
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `thrones_query_latency_seconds` | Histogram | `query` |
//! | `thrones_query_total` | Counter | `query`, `outcome` |
//! | `thrones_open_sessions` | Gauge | |
//! | `thrones_http_requests_total` | Counter | `status` |

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("MetricsError: {0}")]
pub struct MetricsError(String);

impl From<prometheus::Error> for MetricsError {
    fn from(e: prometheus::Error) -> Self {
        MetricsError(e.to_string())
    }
}

/// How a query execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Ok,
    Error,
    Timeout,
}

impl QueryOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryOutcome::Ok => "ok",
            QueryOutcome::Error => "error",
            QueryOutcome::Timeout => "timeout",
        }
    }
}

/// Registry owned by one server instance.
pub struct Metrics {
    registry: Registry,
    query_latency: HistogramVec,
    queries: IntCounterVec,
    open_sessions: IntGauge,
    http_requests: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let query_latency = HistogramVec::new(
            HistogramOpts::new("thrones_query_latency_seconds", "Query latency in seconds").buckets(vec![
                0.0005, // 500μs
                0.001,  // 1ms
                0.005,  // 5ms
                0.01,   // 10ms
                0.025,  // 25ms
                0.05,   // 50ms
                0.1,    // 100ms
                0.25,   // 250ms
                0.5,    // 500ms
                1.0,    // 1s
                5.0,    // 5s
                10.0,   // 10s
            ]),
            &["query"],
        )?;
        let queries = IntCounterVec::new(
            Opts::new("thrones_query_total", "Queries executed by outcome"),
            &["query", "outcome"],
        )?;
        let open_sessions = IntGauge::new("thrones_open_sessions", "Graph sessions currently held by requests")?;
        let http_requests = IntCounterVec::new(
            Opts::new("thrones_http_requests_total", "HTTP requests by status class"),
            &["status"],
        )?;

        registry.register(Box::new(query_latency.clone()))?;
        registry.register(Box::new(queries.clone()))?;
        registry.register(Box::new(open_sessions.clone()))?;
        registry.register(Box::new(http_requests.clone()))?;

        Ok(Self {
            registry,
            query_latency,
            queries,
            open_sessions,
            http_requests,
        })
    }

    pub fn record_query(&self, query: &str, outcome: QueryOutcome, duration: Duration) {
        self.query_latency
            .with_label_values(&[query])
            .observe(duration.as_secs_f64());
        self.queries.with_label_values(&[query, outcome.as_str()]).inc();
    }

    pub fn query_count(&self, query: &str, outcome: QueryOutcome) -> u64 {
        self.queries.with_label_values(&[query, outcome.as_str()]).get()
    }

    pub fn session_opened(&self) {
        self.open_sessions.inc();
    }

    pub fn session_closed(&self) {
        self.open_sessions.dec();
    }

    pub fn open_sessions(&self) -> i64 {
        self.open_sessions.get()
    }

    /// Counts a response under its status class (`2xx`, `4xx`, ...).
    pub fn record_http_status(&self, status: u16) {
        let class = format!("{}xx", status / 100);
        self.http_requests.with_label_values(&[class.as_str()]).inc();
    }

    /// Exports all metrics in Prometheus text format.
    pub fn export(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MetricsError(e.to_string()))
    }
}
