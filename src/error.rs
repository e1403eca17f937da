//! Custom error types for the application.
//!
//! This module defines the primary error type, `MonitorError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of faults this core can see,
//! from I/O and configuration issues to malformed telemetry.
//!
//! The propagation policy is deliberately shallow: no fault here may
//! terminate the dispatch loop or a transport adapter. Faults are terminal
//! only to the unit of work they affect — one line, one file, one
//! connection — so most call sites log a `MonitorError` and move on rather
//! than bubbling it to the top.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, MonitorError>;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decompression failed for file {file_id}: {message}")]
    Decompress { file_id: u32, message: String },

    #[error("Invalid command: {0}")]
    Command(String),

    #[error("Write endpoint error: {0}")]
    Endpoint(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_decompress_error_with_file_id() {
        let err = MonitorError::Decompress {
            file_id: 7,
            message: "truncated header".into(),
        };
        assert_eq!(
            err.to_string(),
            "Decompression failed for file 7: truncated header"
        );
    }

    #[test]
    fn wraps_io_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: MonitorError = io.into();
        assert!(matches!(err, MonitorError::Io(_)));
    }
}
