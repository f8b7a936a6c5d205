//! Tracing initialization.
//!
//! Log lines go to stderr so that neither stdout nor the report file ever carries them. The
//! filter is taken from `RUST_LOG` and defaults to `info`; use `RUST_LOG=mailperf=debug` to see
//! per-section aggregation logs.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber (fmt layer on stderr + env filter)
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    info!("Telemetry initialized");

    Ok(())
}
