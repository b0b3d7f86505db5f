use std::sync::OnceLock;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter; wins over the configured level.
pub const LOG_ENV: &str = "LUNETTE_LOG";

static INIT: OnceLock<()> = OnceLock::new();

/// Filter from `LUNETTE_LOG`, else from `fallback`, else `warn`.
pub fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the stderr subscriber once per process.
pub fn init(fallback: &str) {
    INIT.get_or_init(|| {
        let _ = SubscriberBuilder::default()
            .with_env_filter(filter(fallback))
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
            .try_init();
    });
    tracing::debug!(fallback, "tracing initialised");
}
