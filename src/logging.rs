//! Structured logs for the gateway.
//!
//! Authentication outcomes are logged with their scheme: successes at
//! debug, rejections at warn, directory failures at error. Raw init data,
//! tokens and secrets never reach a log line.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Gateway events at info plus the per-request spans from the HTTP trace layer.
const DEFAULT_FILTER: &str = "mini_app_gateway=info,tower_http=info";

/// Install the process-wide JSON subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]; set
/// `RUST_LOG=mini_app_gateway::auth=debug` to see why a credential was refused.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_target(true)
                .with_current_span(false),
        )
        .init();
}

/// Plain-text subscriber captured by the test harness, showing auth decisions.
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("mini_app_gateway=debug")
        .try_init();
}
