//! Overlay error types
//!
//! Collaborator failures pass through unchanged; everything else is a labeled
//! unsupported-operation, policy or parse error.

use crate::path::PathError;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// A path that breaks overlay policy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}: {path}")]
pub struct PolicyViolation {
    pub path: String,
    pub reason: String,
}

impl PolicyViolation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// A directory showed up where only files are expected
    pub fn not_a_file(path: impl Into<String>) -> Self {
        Self::new(path, "Not a file")
    }

    /// A mutating call was handed a path carrying an entry id
    pub fn entry_suffix(path: impl Into<String>) -> Self {
        Self::new(path, "Cannot write through a path with an entry id")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Policy violation: {0}")]
    PolicyViolation(#[from] PolicyViolation),

    #[error(transparent)]
    Parse(#[from] PathError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl OverlayError {
    pub fn unsupported(what: impl Into<String>) -> Self {
        OverlayError::Unsupported(what.into())
    }
}
