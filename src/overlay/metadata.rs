//! Metadata overlay
//!
//! Builds overlay file statuses from the backing store's status and attaches a
//! cache registry entry to every eligible file, creating the entry on first
//! sight.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::{OverlayError, PolicyViolation};
use crate::path::{self, EntryId, LogicalPath, OverlayRoot};
use crate::registry::CacheRegistry;
use crate::store::{BackingStore, FileStatus};

/// Block size reported for every overlay status
pub const UNBOUNDED_BLOCK_SIZE: u64 = i32::MAX as u64;

/// File status as seen through the overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayFileStatus {
    pub length: u64,
    pub is_dir: bool,
    pub replication: u16,
    pub block_size: u64,
    pub modification_time: u64,
    pub access_time: u64,
    pub permission: u16,
    pub owner: String,
    pub group: String,
    pub path: LogicalPath,
}

impl OverlayFileStatus {
    fn from_store(status: FileStatus, path: LogicalPath) -> Self {
        Self {
            length: status.length,
            is_dir: status.is_dir,
            replication: status.replication,
            block_size: UNBOUNDED_BLOCK_SIZE,
            modification_time: status.modification_time,
            access_time: status.access_time,
            permission: status.permission,
            owner: status.owner,
            group: status.group,
            path,
        }
    }

    pub fn entry_id(&self) -> Option<EntryId> {
        self.path.entry_id
    }
}

/// Result of listing a directory: statuses in store order plus the
/// non-fatal violations recorded along the way
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub statuses: Vec<OverlayFileStatus>,
    pub violations: Vec<PolicyViolation>,
}

pub struct MetadataOverlay {
    store: Arc<dyn BackingStore>,
    registry: Arc<dyn CacheRegistry>,
    root: OverlayRoot,
    /// Data in transit lives here and never gets an entry
    staging_prefix: String,
}

impl MetadataOverlay {
    pub fn new(
        store: Arc<dyn BackingStore>,
        registry: Arc<dyn CacheRegistry>,
        root: OverlayRoot,
        staging_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            root,
            staging_prefix: staging_prefix.into(),
        }
    }

    pub fn is_staging(&self, raw_path: &str) -> bool {
        path::is_under(raw_path, &self.staging_prefix)
    }

    /// Overlay status for a raw path
    ///
    /// Directories and staging files come back without an entry id. Other
    /// files get their existing entry, or a freshly created one; a failed
    /// creation leaves the file uncached for this call.
    pub async fn stat(&self, raw_path: &str) -> Result<OverlayFileStatus, OverlayError> {
        let status = self.store.status(raw_path).await?;

        let entry_id = if status.is_dir || self.is_staging(raw_path) {
            None
        } else {
            self.attach_entry(raw_path).await?
        };

        let logical = self.root.logical(raw_path, entry_id);
        trace!(path = %logical, is_dir = status.is_dir, length = status.length, "Overlay status");
        Ok(OverlayFileStatus::from_store(status, logical))
    }

    async fn attach_entry(&self, raw_path: &str) -> Result<Option<EntryId>, OverlayError> {
        if let Some(id) = self.registry.lookup(raw_path).await? {
            debug!(path = raw_path, entry_id = %id, "Registry has entry");
            return Ok(Some(id));
        }

        let created = self.registry.create(raw_path).await?;
        match created {
            Some(id) => debug!(path = raw_path, entry_id = %id, "Created registry entry"),
            None => debug!(path = raw_path, "Registry entry creation failed, leaving uncached"),
        }
        Ok(created)
    }

    /// Overlay statuses for the children of a directory, in store order
    ///
    /// Child directories are recorded as violations but still included.
    pub async fn list(&self, dir_raw_path: &str) -> Result<Listing, OverlayError> {
        let children = self.store.list(dir_raw_path).await?;

        let violations: Vec<PolicyViolation> = children
            .iter()
            .filter(|child| child.is_dir)
            .map(|child| PolicyViolation::not_a_file(self.root.logical(&child.path, None).to_string()))
            .collect();

        let mut statuses = Vec::with_capacity(children.len());
        for child in &children {
            statuses.push(self.stat(&child.path).await?);
        }

        debug!(
            path = dir_raw_path,
            count = statuses.len(),
            violations = violations.len(),
            "Listed overlay directory"
        );
        Ok(Listing {
            statuses,
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::testing::{MemoryRegistry, MemoryStore, UnreachableRegistry};
    use std::sync::atomic::Ordering;

    const STAGING: &str = "/tmp/staging";

    fn root() -> OverlayRoot {
        OverlayRoot::new("tachyon", "h", 19998)
    }

    fn overlay(store: &Arc<MemoryStore>, registry: &Arc<MemoryRegistry>) -> MetadataOverlay {
        MetadataOverlay::new(store.clone(), registry.clone(), root(), STAGING)
    }

    #[tokio::test]
    async fn test_stat_creates_entry_for_new_file() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/data/a.csv", b"a,b,c\n");
        let registry = Arc::new(MemoryRegistry::starting_at(42));

        let status = overlay(&store, &registry).stat("/data/a.csv").await.unwrap();

        assert_eq!(status.path.to_string(), "tachyon://h:19998/data/a.csv%42");
        assert_eq!(status.entry_id(), Some(EntryId::new(42)));
        assert_eq!(status.length, 6);
        assert_eq!(status.block_size, UNBOUNDED_BLOCK_SIZE);
        assert_eq!(status.permission, 0o644);
        assert_eq!(status.owner, "hadoop");
    }

    #[tokio::test]
    async fn test_stat_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/data/a.csv", b"x");
        let registry = Arc::new(MemoryRegistry::new());
        let overlay = overlay(&store, &registry);

        let first = overlay.stat("/data/a.csv").await.unwrap();
        let second = overlay.stat("/data/a.csv").await.unwrap();

        assert!(first.entry_id().is_some());
        assert_eq!(first.entry_id(), second.entry_id());
        // The second call finds the entry through lookup
        assert_eq!(registry.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stat_uses_existing_entry() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/data/a.csv", b"x");
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert("/data/a.csv", 9);

        let status = overlay(&store, &registry).stat("/data/a.csv").await.unwrap();
        assert_eq!(status.entry_id(), Some(EntryId::new(9)));
        assert_eq!(registry.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stat_directory_has_no_entry() {
        let store = Arc::new(MemoryStore::new());
        store.add_dir("/data");
        let registry = Arc::new(MemoryRegistry::new());

        let status = overlay(&store, &registry).stat("/data").await.unwrap();
        assert!(status.is_dir);
        assert_eq!(status.entry_id(), None);
        assert_eq!(status.path.to_string(), "tachyon://h:19998/data");
        assert_eq!(registry.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stat_staging_file_has_no_entry() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/tmp/staging/part-00000", b"x");
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert("/tmp/staging/part-00000", 5);

        let status = overlay(&store, &registry)
            .stat("/tmp/staging/part-00000")
            .await
            .unwrap();
        assert_eq!(
            status.path.to_string(),
            "tachyon://h:19998/tmp/staging/part-00000"
        );
        assert_eq!(status.entry_id(), None);
    }

    #[tokio::test]
    async fn test_stat_failed_creation_leaves_file_uncached() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/data/a.csv", b"x");
        let registry = Arc::new(MemoryRegistry::failing());

        let status = overlay(&store, &registry).stat("/data/a.csv").await.unwrap();
        assert_eq!(status.entry_id(), None);
        assert_eq!(status.path.to_string(), "tachyon://h:19998/data/a.csv");
    }

    #[tokio::test]
    async fn test_stat_propagates_store_failure() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(MemoryRegistry::new());

        let err = overlay(&store, &registry).stat("/missing").await.unwrap_err();
        assert!(matches!(err, OverlayError::Store(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_stat_propagates_registry_failure() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/data/a.csv", b"x");
        let overlay =
            MetadataOverlay::new(store.clone(), Arc::new(UnreachableRegistry), root(), STAGING);

        let err = overlay.stat("/data/a.csv").await.unwrap_err();
        assert!(matches!(err, OverlayError::Registry(_)));
    }

    #[tokio::test]
    async fn test_list_keeps_store_order_and_records_directories() {
        let store = Arc::new(MemoryStore::new());
        store.add_dir("/data");
        store.add_file("/data/a.csv", b"a");
        store.add_file("/data/b.csv", b"bb");
        store.add_dir("/data/subdir");
        let registry = Arc::new(MemoryRegistry::new());

        let listing = overlay(&store, &registry).list("/data").await.unwrap();

        let paths: Vec<String> = listing.statuses.iter().map(|s| s.path.raw_path.clone()).collect();
        assert_eq!(paths, vec!["/data/a.csv", "/data/b.csv", "/data/subdir"]);
        assert!(listing.statuses[0].entry_id().is_some());
        assert!(listing.statuses[1].entry_id().is_some());
        assert_eq!(listing.statuses[2].entry_id(), None);

        assert_eq!(listing.violations.len(), 1);
        assert_eq!(listing.violations[0].path, "tachyon://h:19998/data/subdir");
    }

    #[tokio::test]
    async fn test_list_never_resorts() {
        let store = Arc::new(MemoryStore::new());
        store.add_dir("/data");
        store.add_file("/data/z.csv", b"z");
        store.add_file("/data/a.csv", b"a");
        let registry = Arc::new(MemoryRegistry::new());

        let listing = overlay(&store, &registry).list("/data").await.unwrap();
        let paths: Vec<&str> = listing.statuses.iter().map(|s| s.path.raw_path.as_str()).collect();
        assert_eq!(paths, vec!["/data/z.csv", "/data/a.csv"]);
        assert!(listing.violations.is_empty());
    }

    #[tokio::test]
    async fn test_list_stats_each_child_once() {
        let store = Arc::new(MemoryStore::new());
        store.add_dir("/data");
        store.add_file("/data/a.csv", b"a");
        store.add_file("/data/b.csv", b"b");
        store.add_dir("/data/subdir");
        let registry = Arc::new(MemoryRegistry::new());

        overlay(&store, &registry).list("/data").await.unwrap();
        assert_eq!(store.status_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_list_missing_directory_propagates_not_found() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(MemoryRegistry::new());

        let err = overlay(&store, &registry).list("/missing").await.unwrap_err();
        assert!(matches!(err, OverlayError::Store(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_list_child_failure_aborts_listing() {
        let store = Arc::new(MemoryStore::new());
        store.add_dir("/data");
        store.add_file("/data/a.csv", b"a");
        store.add_file("/data/b.csv", b"b");
        store.add_file("/data/c.csv", b"c");
        store.fail_status("/data/b.csv");
        let registry = Arc::new(MemoryRegistry::new());

        let err = overlay(&store, &registry).list("/data").await.unwrap_err();
        assert!(matches!(err, OverlayError::Store(StoreError::Server(500, _))));
        // c.csv is never reached
        assert_eq!(store.status_calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_stat_shares_entry() {
        let store = Arc::new(MemoryStore::new());
        store.add_file("/data/a.csv", b"x");
        let registry = Arc::new(MemoryRegistry::starting_at(42));
        let overlay = overlay(&store, &registry);

        let (first, second) = tokio::join!(overlay.stat("/data/a.csv"), overlay.stat("/data/a.csv"));
        let (first, second) = (first.unwrap(), second.unwrap());

        // Both callers missed on lookup and raced to create
        assert_eq!(registry.create_calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.entry_id(), Some(EntryId::new(42)));
        assert_eq!(first.entry_id(), second.entry_id());
    }
}
