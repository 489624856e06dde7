//! Error types shared by every mobsync crate.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

use crate::saga::SagaLog;

/// Response header the remote platform uses for vendor-specific error codes.
pub const VENDOR_ERROR_HEADER: &str = "Error_code";

/// A non-200 response from the remote platform.
///
/// The body and headers are kept so callers can look for vendor conventions
/// (such as [`VENDOR_ERROR_HEADER`]) that the status code alone does not carry.
#[derive(Debug, Clone)]
pub struct RequestFailure {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RequestFailure {
    /// Value of a response header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The vendor error code carried in the `Error_code` header.
    pub fn vendor_error_code(&self) -> Option<&str> {
        self.header(VENDOR_ERROR_HEADER).map(str::trim)
    }
}

impl std::fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "request failed with status {}", self.status.as_u16())?;
        if let Some(code) = self.vendor_error_code() {
            write!(f, " (error code {code})")?;
        }
        Ok(())
    }
}

/// Top-level error type for all mobsync operations.
#[derive(Debug, Error)]
pub enum MobSyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("LDAP error: {0}")]
    Ldap(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("class already exists: {0}")]
    ClassExists(String),

    #[error("user does not exist: {0}")]
    UserNotFound(String),

    #[error("class does not exist: {0}")]
    ClassNotFound(String),

    #[error("class has no linked group: {0}")]
    GroupNotFound(String),

    #[error("{0}")]
    RequestFailed(RequestFailure),

    /// A multi-step remote protocol stopped half way. Remote state is now
    /// inconsistent and needs manual repair; `completed` lists what did happen.
    #[error("operational error during {operation}: {reason} (completed: {completed})")]
    Operational {
        operation: &'static str,
        completed: SagaLog,
        reason: String,
    },
}

impl MobSyncError {
    /// True for errors that leave remote state inconsistent.
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Operational { .. })
    }
}

/// A convenience Result alias that defaults to [`MobSyncError`].
pub type Result<T> = std::result::Result<T, MobSyncError>;
