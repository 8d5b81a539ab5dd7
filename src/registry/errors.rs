//! Cache registry error types

/// Cache registry error types
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown entry: {0}")]
    UnknownEntry(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl RegistryError {
    /// Create a RegistryError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            404 => RegistryError::UnknownEntry(body.to_string()),
            408 => RegistryError::Timeout,
            503 => RegistryError::Unavailable(body.to_string()),
            500..=599 => RegistryError::Server(status, body.to_string()),
            _ => RegistryError::Request(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Map a transport-level failure
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RegistryError::Timeout
        } else if err.is_connect() {
            RegistryError::Unavailable(err.to_string())
        } else if err.is_decode() {
            RegistryError::Decode(err.to_string())
        } else {
            RegistryError::Request(err.to_string())
        }
    }
}
