//! Cache registry access
//!
//! The registry tracks which raw paths have a cached copy, under an integer
//! entry id, and on which hosts the replicas live.

pub mod client;
pub mod errors;
pub mod types;

use async_trait::async_trait;

use crate::path::EntryId;

pub use client::HttpRegistryClient;
pub use errors::RegistryError;

/// Operations the overlay needs from the cache registry
///
/// `lookup` and `create` return `None` for the registry's "no entry" sentinel.
/// The registry is expected to deduplicate by raw path: a `create` for a path
/// that already has an entry answers with the existing id.
#[async_trait]
pub trait CacheRegistry: Send + Sync {
    async fn lookup(&self, path: &str) -> Result<Option<EntryId>, RegistryError>;

    async fn create(&self, path: &str) -> Result<Option<EntryId>, RegistryError>;

    /// Replica host names, in registry order
    async fn locations(&self, id: EntryId) -> Result<Vec<String>, RegistryError>;
}
