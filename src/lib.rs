//! Per-device input event translation engine. Every attached device runs on
//! its own thread, translating raw values into output values according to
//! the current profile.
pub mod config;
pub mod input;
pub mod sync;
pub mod udev;

use std::env;

/// Initialize logging from the `LOG_LEVEL` environment variable, falling
/// back to "info".
pub fn init_logging() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let result = env_logger::Builder::new()
        .parse_filters(&log_level)
        .try_init();
    if let Err(e) = result {
        log::debug!("Logging already initialized: {e}");
    }
}
