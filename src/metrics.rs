//! Request metrics for the scoring service, exposed in Prometheus text format.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Status label recorded for a request whose caller went away mid-flight.
pub const CANCELLED_STATUS: &str = "499";

const DURATION_BUCKETS: [f64; 7] = [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

/// Metrics collector for the HTTP surface
pub struct ServiceMetrics {
    registry: Registry,
    /// Requests by HTTP status, across every route
    requests_total: IntCounterVec,
    /// End-to-end request latency
    request_duration: Histogram,
    /// Individual predictions by decision class
    predictions_total: IntCounterVec,
    /// Requests currently being processed
    active_requests: IntGauge,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new collector with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "credit_scoring_requests_total",
                "Total number of prediction requests",
            ),
            &["status"],
        )?;
        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "credit_scoring_request_duration_seconds",
                "Request duration in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
        )?;
        let predictions_total = IntCounterVec::new(
            Opts::new(
                "credit_scoring_predictions_total",
                "Total predictions by class",
            ),
            &["prediction"],
        )?;
        let active_requests = IntGauge::new(
            "credit_scoring_active_requests",
            "Number of active prediction requests",
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(predictions_total.clone()))?;
        registry.register(Box::new(active_requests.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            predictions_total,
            active_requests,
            start_time: Instant::now(),
        })
    }

    /// Start accounting for one request. The in-flight gauge is raised now
    /// and lowered when the returned guard is dropped.
    pub fn track_request(&self) -> RequestGuard<'_> {
        self.active_requests.inc();
        RequestGuard {
            metrics: self,
            started: Instant::now(),
            status: None,
        }
    }

    /// Record a prediction by decision class label
    pub fn record_prediction(&self, class_label: &str) {
        self.predictions_total
            .with_label_values(&[class_label])
            .inc();
    }

    fn finish_request(&self, status: &str, elapsed: Duration) {
        self.request_duration.observe(elapsed.as_secs_f64());
        self.requests_total.with_label_values(&[status]).inc();
        self.active_requests.dec();
    }

    /// Requests recorded for one status label
    pub fn requests_with_status(&self, status: &str) -> u64 {
        self.requests_total.with_label_values(&[status]).get()
    }

    /// Requests recorded across every status label
    pub fn total_requests(&self) -> u64 {
        sum_counter(&self.requests_total)
    }

    /// Predictions recorded across both classes
    pub fn total_predictions(&self) -> u64 {
        sum_counter(&self.predictions_total)
    }

    pub fn active_requests(&self) -> i64 {
        self.active_requests.get()
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_requests() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Render every metric in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type of [`ServiceMetrics::render`] output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let approved = self.predictions_total.with_label_values(&["0"]).get();
        let denied = self.predictions_total.with_label_values(&["1"]).get();
        let duration_count = self.request_duration.get_sample_count();
        let mean_ms = if duration_count > 0 {
            self.request_duration.get_sample_sum() / duration_count as f64 * 1000.0
        } else {
            0.0
        };

        info!(
            requests = self.total_requests(),
            ok = self.requests_with_status("200"),
            rejected = self.requests_with_status("422"),
            failed = self.requests_with_status("500"),
            cancelled = self.requests_with_status(CANCELLED_STATUS),
            approved,
            denied,
            in_flight = self.active_requests(),
            mean_latency_ms = format!("{:.2}", mean_ms),
            throughput = format!("{:.1} req/s", self.get_throughput()),
            "Metrics summary"
        );
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    use prometheus::core::Collector;

    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|metric| metric.get_counter().get_value() as u64)
        .sum()
}

/// Scoped accounting for one request.
///
/// Dropping the guard without calling [`RequestGuard::finish`] (for example
/// when the request future is cancelled) records the request as
/// [`CANCELLED_STATUS`].
pub struct RequestGuard<'a> {
    metrics: &'a ServiceMetrics,
    started: Instant,
    status: Option<u16>,
}

impl RequestGuard<'_> {
    /// Mark the request as answered with `status`
    pub fn finish(mut self, status: u16) {
        self.status = Some(status);
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        let status = self
            .status
            .map(|code| code.to_string())
            .unwrap_or_else(|| CANCELLED_STATUS.to_string());
        self.metrics.finish_request(&status, self.started.elapsed());
    }
}

/// Real-time metrics reporter that logs periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_records_status_and_gauge() {
        let metrics = ServiceMetrics::new().unwrap();

        let guard = metrics.track_request();
        assert_eq!(metrics.active_requests(), 1);
        guard.finish(200);

        assert_eq!(metrics.active_requests(), 0);
        assert_eq!(metrics.requests_with_status("200"), 1);
        assert_eq!(metrics.total_requests(), 1);
    }

    #[test]
    fn test_dropped_guard_counts_as_cancelled() {
        let metrics = ServiceMetrics::new().unwrap();

        {
            let _guard = metrics.track_request();
        }

        assert_eq!(metrics.active_requests(), 0);
        assert_eq!(metrics.requests_with_status(CANCELLED_STATUS), 1);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let metrics = Arc::new(ServiceMetrics::new().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.track_request().finish(200);
                        metrics.record_prediction("1");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.total_requests(), 2000);
        assert_eq!(metrics.total_predictions(), 2000);
        assert_eq!(metrics.active_requests(), 0);
    }

    #[test]
    fn test_render_exposition_format() {
        let metrics = ServiceMetrics::new().unwrap();
        metrics.track_request().finish(422);
        metrics.record_prediction("0");

        let text = metrics.render().unwrap();

        assert!(text.contains("credit_scoring_requests_total{status=\"422\"} 1"));
        assert!(text.contains("credit_scoring_predictions_total{prediction=\"0\"} 1"));
        assert!(text.contains("credit_scoring_request_duration_seconds_bucket"));
        assert!(text.contains("credit_scoring_active_requests 0"));
    }
}
