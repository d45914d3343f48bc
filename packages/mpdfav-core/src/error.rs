//! Centralized error types for the mpdfav core library.
//!
//! This module provides a unified error handling system that:
//! - Defines the daemon-level error type using `thiserror`
//! - Gives every error a machine-readable code for log lines
//! - Re-exports the per-module error and Result types

use thiserror::Error;

use crate::mpd::MpdError;
use crate::services::ratings::RatingError;
use crate::services::ServiceError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for MpdError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "mpd_connect_failed",
            Self::ConnectTimeout(_) => "mpd_connect_timeout",
            Self::Io(_) => "mpd_io_error",
            Self::Greeting(_) => "mpd_bad_greeting",
            Self::Ack(_) => "mpd_ack",
            Self::Malformed(_) => "mpd_malformed_response",
            Self::Closed => "mpd_connection_closed",
        }
    }
}

impl ErrorCode for RatingError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRatingCode(_) => "invalid_rating_code",
            Self::Sticker(_) => "rating_sticker_write_failed",
        }
    }
}

impl ErrorCode for ServiceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe_failed",
            Self::Status(_) => "status_failed",
            Self::CurrentSong(_) => "current_song_failed",
            Self::ReadMessages(_) => "read_messages_failed",
            Self::Sticker(_) => "sticker_failed",
            Self::Idle(_) => "idle_failed",
            Self::IdleClosed => "idle_closed",
            Self::Rating(e) => e.code(),
        }
    }
}

/// Errors that end the daemon loop.
///
/// Service failures are deliberately absent: they only restart the group.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The shared MPD connection could not be established.
    #[error("Failed to connect to MPD: {0}")]
    Connect(#[source] MpdError),

    /// Every service is disabled, so a group would exit immediately.
    #[error("No services enabled")]
    NoServicesEnabled,

    /// The configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ErrorCode for DaemonError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect(e) => e.code(),
            Self::NoServicesEnabled => "no_services_enabled",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::mpd::MpdResult;
pub use crate::services::ratings::RatingResult;
pub use crate::services::ServiceResult;

/// Convenient Result alias for daemon-level operations.
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_error_reports_underlying_code() {
        let err = DaemonError::Connect(MpdError::ConnectTimeout("localhost:6600".into()));
        assert_eq!(err.code(), "mpd_connect_timeout");
        assert_eq!(
            err.to_string(),
            "Failed to connect to MPD: Connection to localhost:6600 timed out"
        );
    }

    #[test]
    fn rating_errors_keep_their_code_inside_service_errors() {
        let err = ServiceError::Rating(RatingError::InvalidRatingCode("11".into()));
        assert_eq!(err.code(), "invalid_rating_code");
    }
}
