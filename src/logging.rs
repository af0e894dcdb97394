//! Tracing subscriber setup shared by the binary and tests.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Default level for a `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub fn level_for(verbosity: u8) -> tracing::Level {
    match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Build a stderr subscriber. `RUST_LOG` directives take precedence over the
/// verbosity default.
pub fn build_subscriber(verbosity: u8) -> impl tracing::Subscriber + Send + Sync {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    subscriber_with(verbosity, &directives, std::io::stderr)
}

fn subscriber_with<W>(
    verbosity: u8,
    directives: &str,
    writer: W,
) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .parse_lossy(directives);
    // notify's internals are chatty at debug
    if let Ok(directive) = "notify=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let fmt_layer = fmt::layer().with_writer(writer).with_target(false);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init(verbosity: u8) -> bool {
    build_subscriber(verbosity).try_init().is_ok()
}
