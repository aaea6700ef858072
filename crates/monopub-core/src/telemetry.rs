//! Tracing initialization for the CLI and tests.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// The level can be overridden through the `MONOPUB_LOG` environment
/// variable; `json` switches to JSON-formatted log lines for machine
/// consumption. Repeated calls are harmless (later ones are ignored).
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_env("MONOPUB_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}
