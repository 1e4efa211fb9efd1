//! Tracing subscriber bootstrap shared by the server and the CLI.

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this twice is
/// harmless: the second call reports that a subscriber already exists and
/// is otherwise a no-op.
pub fn init(format: Format, default_filter: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("invalid log filter '{default_filter}'"))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        Format::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        Format::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!(target: "bookstore-telemetry", "global subscriber already installed");
        return Ok(());
    }

    tracing::info!(target: "bookstore-telemetry", ?format, "telemetry initialized");
    Ok(())
}
