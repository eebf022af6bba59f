//! Function to setup logging in binaries and tests.

/// Resolve the active log filter.
///
/// `ENGINE_LOG_LEVEL` wins over `RUST_LOG`; the default is `info`.
pub fn default_log_filter() -> String {
    std::env::var("ENGINE_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_owned())
        .trim()
        .to_lowercase()
}

/// Directs [`log`] calls to stderr.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn setup_logging() {
    fn setup() {
        if cfg!(debug_assertions) && std::env::var("RUST_BACKTRACE").is_err() {
            // In debug builds, default `RUST_BACKTRACE` to `1` if it is not set.
            // This ensures we produce backtraces if examples (etc) panic.
            std::env::set_var("RUST_BACKTRACE", "1");
        }

        let log_filter = default_log_filter();

        if log_filter.contains("trace") {
            log::set_max_level(log::LevelFilter::Trace);
        } else if log_filter.contains("debug") {
            log::set_max_level(log::LevelFilter::Debug);
        } else {
            log::set_max_level(log::LevelFilter::Info);
        }

        let mut stderr_logger = env_logger::Builder::new();
        stderr_logger.parse_filters(&log_filter);
        stderr_logger.init();
    }

    use std::sync::Once;
    static START: Once = Once::new();
    START.call_once(setup);
}
