//! Logging and metrics setup for the binary

use anyhow::{Context, Result, anyhow};
use opentelemetry::global;
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingConfig, TelemetryConfig};

const SERVICE_NAME: &str = "mission_co2";

/// Filter directive for the configured level. `--verbose` raises it to debug.
#[must_use]
pub fn log_directive(config: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("{SERVICE_NAME}={level}")
}

/// Install the global `tracing` subscriber. `RUST_LOG` takes precedence over
/// the configured level.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(config, verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.format == "compact" {
        builder.compact().try_init()
    } else {
        builder.pretty().try_init()
    };

    installed.map_err(|e| anyhow!("Failed to install log subscriber: {e}"))
}

/// Handle on the installed meter provider, if any
#[derive(Default)]
pub struct Telemetry {
    meter_provider: Option<SdkMeterProvider>,
}

impl Telemetry {
    /// Export metrics over OTLP/HTTP when an endpoint is configured.
    ///
    /// Without an endpoint the global no-op meter provider stays in place and
    /// counters only feed the in-process run summary.
    pub fn init(config: &TelemetryConfig) -> Result<Self> {
        let Some(endpoint) = config
            .otlp_endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
        else {
            return Ok(Self::default());
        };

        let exporter = MetricExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()
            .context("Failed to build OTLP metric exporter")?;

        let provider = SdkMeterProvider::builder()
            .with_periodic_exporter(exporter)
            .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
            .build();

        global::set_meter_provider(provider.clone());
        tracing::debug!("Exporting metrics to {}", endpoint);

        Ok(Self {
            meter_provider: Some(provider),
        })
    }

    /// Flush pending metrics and stop the exporter
    pub fn shutdown(self) {
        if let Some(provider) = self.meter_provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!("Metrics shutdown failed: {}", e);
            }
        }
    }
}
