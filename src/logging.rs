//! Tracing setup for the shell binary.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "FINDIFF_LOG";
pub const DEFAULT_LOG_FILTER: &str = "findiff=info,findiff_provider_ws=info,findiff_api=warn";

/// Filter from `FINDIFF_LOG`, falling back to the default when unset or invalid.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the stderr subscriber. A second call is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
