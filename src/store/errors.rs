//! Backing store error types
//!
//! Maps WebHDFS HTTP status codes and `RemoteException` bodies to specific
//! variants so callers see the store's own failure unchanged.

use serde::Deserialize;

/// Backing store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionBody {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    exception: String,
    #[serde(default)]
    message: String,
}

impl StoreError {
    /// Create a StoreError from an HTTP status code and response body
    ///
    /// WebHDFS reports failures as `{"RemoteException": {...}}`; the exception
    /// name takes priority over the status code when present.
    pub fn from_status(status: u16, body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<RemoteExceptionBody>(body) {
            let RemoteException { exception, message } = parsed.remote_exception;
            match exception.as_str() {
                "FileNotFoundException" => return StoreError::NotFound(message),
                "FileAlreadyExistsException" => return StoreError::AlreadyExists(message),
                "AccessControlException" | "SecurityException" => {
                    return StoreError::AccessDenied(message)
                }
                _ => {}
            }
            return Self::from_code(status, format!("{}: {}", exception, message));
        }
        Self::from_code(status, body.to_string())
    }

    fn from_code(status: u16, message: String) -> Self {
        match status {
            401 | 403 => StoreError::AccessDenied(message),
            404 => StoreError::NotFound(message),
            408 => StoreError::Timeout,
            500..=599 => StoreError::Server(status, message),
            _ => StoreError::Request(format!("HTTP {}: {}", status, message)),
        }
    }

    /// Map a transport-level failure
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_connect() {
            StoreError::Network(err.to_string())
        } else if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Request(err.to_string())
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
