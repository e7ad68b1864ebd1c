//! Load Generator
//!
//! Generates synthetic credit applications and posts them to a running
//! scoring service, then reports latency and the decision mix.
//!
//! Usage: load-generator [base_url] [count] [risky_rate] [batch_size] [delay_ms]

use anyhow::Context;
use credit_scoring_service::types::{BatchPayload, CreditApplicationPayload};
use rand::Rng;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Application generator for load testing
struct ApplicationGenerator {
    rng: rand::rngs::ThreadRng,
}

impl ApplicationGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Established borrower with a clean history
    fn generate_safe(&mut self) -> CreditApplicationPayload {
        CreditApplicationPayload {
            age: Some(self.rng.gen_range(30..65) as f64),
            income: Some(self.rng.gen_range(45_000.0..150_000.0)),
            loan_amount: Some(self.rng.gen_range(2_000.0..25_000.0)),
            credit_history_length: Some(self.rng.gen_range(5..30) as f64),
            num_open_accounts: Some(self.rng.gen_range(2..8) as f64),
            debt_to_income: Some(self.rng.gen_range(0.05..0.35)),
            num_late_payments: Some(self.rng.gen_range(0..2) as f64),
            employment_length: Some(self.rng.gen_range(3..25) as f64),
            num_credit_inquiries: Some(self.rng.gen_range(0..3) as f64),
            credit_utilization: Some(self.rng.gen_range(0.05..0.4)),
        }
    }

    /// Thin file, high leverage and recent delinquencies
    fn generate_risky(&mut self) -> CreditApplicationPayload {
        CreditApplicationPayload {
            age: Some(self.rng.gen_range(18..30) as f64),
            income: Some(self.rng.gen_range(12_000.0..35_000.0)),
            loan_amount: Some(self.rng.gen_range(25_000.0..80_000.0)),
            credit_history_length: Some(self.rng.gen_range(0..3) as f64),
            num_open_accounts: Some(self.rng.gen_range(8..20) as f64),
            debt_to_income: Some(self.rng.gen_range(0.6..1.0)),
            num_late_payments: Some(self.rng.gen_range(3..12) as f64),
            employment_length: Some(self.rng.gen_range(0..2) as f64),
            num_credit_inquiries: Some(self.rng.gen_range(5..15) as f64),
            credit_utilization: Some(self.rng.gen_range(0.8..1.0)),
        }
    }

    fn generate(&mut self, risky_rate: f64) -> (CreditApplicationPayload, bool) {
        if self.rng.gen_bool(risky_rate) {
            (self.generate_risky(), true)
        } else {
            (self.generate_safe(), false)
        }
    }
}

#[derive(Default)]
struct RunStats {
    sent: u64,
    failed: u64,
    approved: u64,
    denied: u64,
    latencies_ms: Vec<f64>,
}

impl RunStats {
    fn record_response(&mut self, body: &Value, elapsed: Duration) {
        self.latencies_ms.push(elapsed.as_secs_f64() * 1000.0);
        let predictions = match body.get("predictions").and_then(Value::as_array) {
            Some(batch) => batch.iter().collect::<Vec<_>>(),
            None => vec![body],
        };
        for prediction in predictions {
            match prediction.get("prediction").and_then(Value::as_u64) {
                Some(1) => self.denied += 1,
                Some(_) => self.approved += 1,
                None => {}
            }
        }
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.latencies_ms.is_empty() {
            return 0.0;
        }
        let mut sorted = self.latencies_ms.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    fn print_summary(&self, wall_time: Duration) {
        let throughput = if wall_time.as_secs_f64() > 0.0 {
            self.sent as f64 / wall_time.as_secs_f64()
        } else {
            0.0
        };
        info!("=== Load Test Summary ===");
        info!(
            "Requests: {} sent, {} failed ({:.1} req/s)",
            self.sent, self.failed, throughput
        );
        info!(
            "Decisions: {} approved, {} denied",
            self.approved, self.denied
        );
        info!(
            "Latency (ms): p50={:.2}, p95={:.2}, p99={:.2}",
            self.percentile(50.0),
            self.percentile(95.0),
            self.percentile(99.0)
        );
        info!("=========================");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("load_generator=info".parse()?),
        )
        .init();

    info!("Starting Load Generator");

    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let risky_rate: f64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.2_f64)
        .clamp(0.0, 1.0);
    let batch_size: usize = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(1).max(1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(10);

    info!(
        base_url = %base_url,
        count,
        risky_rate,
        batch_size,
        delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    match client.get(format!("{}/health", base_url)).send().await {
        Ok(response) => {
            let health: Value = response.json().await.unwrap_or(Value::Null);
            info!(status = %health["status"], "Service reachable");
        }
        Err(e) => {
            warn!(error = %e, "Service unreachable. Running in dry-run mode.");
            return run_dry_mode(count, risky_rate, delay_ms).await;
        }
    }

    let mut generator = ApplicationGenerator::new();
    let mut stats = RunStats::default();
    let started = Instant::now();

    let mut remaining = count;
    while remaining > 0 {
        let size = remaining.min(batch_size as u64);
        remaining -= size;

        let request = if size == 1 {
            let (application, _) = generator.generate(risky_rate);
            client
                .post(format!("{}/predict", base_url))
                .json(&application)
        } else {
            let applications = (0..size).map(|_| generator.generate(risky_rate).0).collect();
            client
                .post(format!("{}/predict/batch", base_url))
                .json(&BatchPayload {
                    applications: Some(applications),
                })
        };

        let sent_at = Instant::now();
        stats.sent += 1;
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                let body: Value = response.json().await.unwrap_or(Value::Null);
                stats.record_response(&body, sent_at.elapsed());
            }
            Ok(response) => {
                stats.failed += 1;
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), body = %body, "Request rejected");
            }
            Err(e) => {
                stats.failed += 1;
                warn!(error = %e, "Request failed");
            }
        }

        if stats.sent % 50 == 0 {
            info!(
                "Sent {} requests ({} approved, {} denied so far)",
                stats.sent, stats.approved, stats.denied
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    stats.print_summary(started.elapsed());
    Ok(())
}

async fn run_dry_mode(count: u64, risky_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no service connection)");

    let mut generator = ApplicationGenerator::new();
    let mut risky = 0u64;

    for i in 0..count {
        let (application, is_risky) = generator.generate(risky_rate);
        if is_risky {
            risky += 1;
        }

        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string_pretty(&application)?;
            info!("Sample application {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Generated {} applications ({} risky)", count, risky);
    Ok(())
}
