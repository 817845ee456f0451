//! # Observability
//!
//! Tracing + Prometheus metrics for the recorder.
//!
//! - `tracing` subscriber with `EnvFilter` (honours `RUST_LOG`) in JSON,
//!   pretty or compact form
//! - optional Prometheus scrape endpoint
//! - recorder metrics and running latency statistics ([`metrics`])
//!
//! ## Example
//!
//! ```ignore
//! use observability::{init_with_config, metrics, ObservabilityConfig};
//!
//! init_with_config(ObservabilityConfig::default())?;
//!
//! metrics::record_frame_recorded("front_camera", "camera", 12288);
//! ```

pub mod metrics;

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_active_sensors, record_callback_dropped, record_frame_recorded, record_latency_ms,
    record_session_duration, DropReason, RunningStats, StatsSummary,
};

/// Logging and metrics settings for one process
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus scrape port; `None` disables the exporter
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// Log line layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with thread and source location
    #[default]
    Json,
    /// Multi-line, human-readable
    Pretty,
    /// Single line per event
    Compact,
}

/// JSON logs, no metrics endpoint
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Install the global subscriber and, if configured, the Prometheus exporter.
///
/// Fails if a global subscriber is already set.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_log_level))
        .with_context(|| format!("Invalid log filter '{}'", config.default_log_level))?;

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus recorder, listening on all interfaces
pub fn init_metrics_only(port: u16) -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to start Prometheus exporter on {addr}"))?;

    tracing::info!(%addr, "Prometheus metrics endpoint listening");
    Ok(())
}
