use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
/// Output goes to stderr so `sync` can print its JSON summary on stdout.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))
}
