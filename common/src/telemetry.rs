// Telemetry module for structured logging and metrics

use crate::config::{LogFormat, ObservabilityConfig};
use crate::errors::Step;
use crate::models::PublishOutcome;
use anyhow::Result;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Initialize structured logging
///
/// JSON lines by default, human-readable output with `log_format = "pretty"`.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(log_level: &str, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::debug!(log_level = log_level, format = ?format, "Logging initialized");
    Ok(())
}

/// Initialize logging and, when a port is configured, the metrics exporter
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    init_logging(&config.log_level, config.log_format)?;
    if let Some(port) = config.metrics_port {
        init_metrics(port)?;
    }
    Ok(())
}

/// Initialize Prometheus metrics exporter
///
/// Registered metrics:
/// - shop_runs_total{outcome}: finished runs by outcome
/// - shop_step_failures_total{step}: failures by pipeline step
/// - shop_run_duration_seconds: run wall-clock time
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_counter!("shop_runs_total", "Total number of finished publisher runs");
    describe_counter!(
        "shop_step_failures_total",
        "Total number of publisher runs that failed, by step"
    );
    describe_histogram!(
        "shop_run_duration_seconds",
        "Duration of publisher runs in seconds"
    );

    tracing::info!(
        metrics_port = metrics_port,
        metrics_endpoint = format!("http://0.0.0.0:{}/metrics", metrics_port),
        "Prometheus metrics exporter initialized"
    );

    Ok(())
}

/// Record a successful run
#[inline]
pub fn record_run_success(outcome: &PublishOutcome, duration_seconds: f64) {
    let label = if outcome.committed() {
        "committed"
    } else {
        "unchanged"
    };
    counter!("shop_runs_total", "outcome" => label).increment(1);
    histogram!("shop_run_duration_seconds").record(duration_seconds);
}

/// Record a failed run
#[inline]
pub fn record_run_failure(step: Step, duration_seconds: f64) {
    counter!("shop_runs_total", "outcome" => "failed").increment(1);
    counter!("shop_step_failures_total", "step" => step.as_str()).increment(1);
    histogram!("shop_run_duration_seconds").record(duration_seconds);
}
