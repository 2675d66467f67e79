//! Structured logging for the Westeros service.
//!
//! Built on the `tracing` crate. The `THRONES_LOG` environment variable takes
//! precedence over the configured level.
//!
//! # Environment Variables
//!
//! - `THRONES_LOG=info` - Default log level (info)
//! - `THRONES_LOG=debug` - Logs every query with its latency
//! - `THRONES_LOG=warn,thrones_executor=debug` - Combined filters
//! - `THRONES_LOG=tower_http=debug` - Request spans

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "THRONES_LOG";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initializes the global tracing subscriber at `info`.
///
/// Subsequent calls are ignored (tracing only allows one subscriber).
pub fn init() {
    init_with_default("info");
}

/// Initializes the global tracing subscriber with a custom default level.
pub fn init_with_default(default_level: &str) {
    let subscriber = fmt()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let _ = subscriber.try_init();
}

/// Initializes logging with JSON output format.
pub fn init_json(default_level: &str) {
    let subscriber = fmt()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .json();

    let _ = subscriber.try_init();
}

/// Initializes logging from the `[logging]` section.
pub fn init_from_config(config: &LoggingConfig) {
    if config.json {
        init_json(&config.level);
    } else {
        init_with_default(&config.level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_does_not_panic() {
        init();
        init();
        init_with_default("warn");
        init_from_config(&LoggingConfig {
            level: "debug".into(),
            json: true,
        });
    }
}
