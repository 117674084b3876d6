use tracing_subscriber::EnvFilter;

use crate::Error;

const DEFAULT_FILTER: &str = "info,roamly_core=debug,roamly_api=debug";

/// Logs go to stderr; stdout carries command output.
pub fn init() -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
