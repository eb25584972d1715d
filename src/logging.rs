// Logging setup

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "tubedrop=info,tower_http=info";

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `directive`; an unparsable directive
/// falls back to [`DEFAULT_LOG_FILTER`]. Calling this twice is harmless.
pub fn init_logging(directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
