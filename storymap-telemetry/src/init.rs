//! Telemetry initialization

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Clone, Copy)]
enum Format {
    Pretty,
    Json,
}

/// Initialize console logging.
///
/// The filter is read from `RUST_LOG` and defaults to `info`. Only the first
/// call installs a subscriber; later calls are no-ops.
///
/// # Example
/// ```
/// use storymap_telemetry::init_telemetry;
/// init_telemetry("storymap-agent").expect("Failed to initialize telemetry");
/// ```
pub fn init_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    init_once(service_name, Format::Pretty)
}

/// Same as [`init_telemetry`] but emits one JSON object per event.
pub fn init_json_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    init_once(service_name, Format::Json)
}

fn init_once(service_name: &str, format: Format) -> Result<(), TelemetryError> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = install(format);
        if result.is_ok() {
            tracing::info!(service.name = service_name, "Telemetry initialized");
        }
    });
    result
}

fn install(format: Format) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("info")?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        Format::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init()?,
        Format::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()?,
    }
    Ok(())
}
