// 📝 Logging - tracing subscriber setup
//
// RUST_LOG controls the filter (default: info), e.g.
//   RUST_LOG=sales_forecast=trace forecast-server

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise logging for binaries
///
/// Output goes to stderr so CSV/JSON written to stdout stays clean.
///
/// ```no_run
/// sales_forecast::logging::init();
/// ```
pub fn init() {
    init_with_default("info");
}

/// Initialise logging with a fallback filter used when RUST_LOG is unset
pub fn init_with_default(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Verbose logging for tests, captured by the test harness
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init_test();
        init_test();
        tracing::debug!("logging initialised twice without panicking");
    }
}
