//! Tracing subscriber initialization.
//!
//! Sets up structured, async-aware logging via `tracing` and
//! `tracing-subscriber`. The level comes from `Settings.log_level` unless
//! `RUST_LOG` overrides it. Initialization is idempotent so tests and
//! library consumers can call it freely.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `level` is the default filter when `RUST_LOG` is unset. Returns `Ok(())`
/// if a subscriber was already installed.
pub fn init(level: Level) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    fmt()
        .compact()
        .with_env_filter(env_filter)
        .with_thread_names(true)
        .try_init()
        .or_else(|e| {
            if e.to_string().contains("already been set") {
                Ok(())
            } else {
                Err(format!("Failed to initialize tracing: {e}"))
            }
        })
}

/// Parse a log level string from the configuration file.
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "Invalid log level '{level}'. Must be one of: trace, debug, info, warn, error"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("INFO"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("Warn"), Ok(Level::WARN)));
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn init_is_idempotent() {
        assert!(init(Level::DEBUG).is_ok());
        assert!(init(Level::INFO).is_ok());
    }
}
