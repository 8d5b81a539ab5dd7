//! Overlay filesystem
//!
//! The caller-facing operation set. Paths are decoded here, policy is applied
//! here, and the work is handed to the metadata overlay, the location resolver
//! or straight to the backing store.

use std::sync::Arc;

use tracing::info;

use super::handles::{CachedReader, InputStream, OutputStream, StoreReader};
use crate::config::Settings;
use crate::errors::{OverlayError, PolicyViolation};
use crate::overlay::{Listing, LocationResolver, MetadataOverlay, OverlayFileStatus};
use crate::path::{self, EntryId, OverlayRoot};
use crate::registry::{CacheRegistry, HttpRegistryClient};
use crate::store::{BackingStore, BlockLocation, CreateOptions, StoreError, WebHdfsStore};

/// Cache-aware view over a backing store
pub struct OverlayFileSystem {
    root: OverlayRoot,
    working_dir: String,
    staging_prefix: String,
    store: Arc<dyn BackingStore>,
    registry: Arc<dyn CacheRegistry>,
    metadata: MetadataOverlay,
    resolver: LocationResolver,
}

impl OverlayFileSystem {
    /// Bind to the registry at `uri`'s host and port and the configured backing store
    pub fn initialize(uri: &str, settings: &Settings) -> Result<Self, OverlayError> {
        let root = OverlayRoot::from_uri(uri)?;
        info!(uri = uri, host = %root.host, port = root.port, "Connecting cache registry");

        let registry =
            HttpRegistryClient::connect(&root.host, root.port, settings.registry.timeout)?;
        let store = WebHdfsStore::new(
            &settings.store.url,
            settings.store.user.clone(),
            settings.store.timeout,
        )?;

        Ok(Self::with_clients(
            root,
            Arc::new(store),
            Arc::new(registry),
            &settings.overlay.staging_prefix,
        ))
    }

    /// Build over already connected collaborators
    pub fn with_clients(
        root: OverlayRoot,
        store: Arc<dyn BackingStore>,
        registry: Arc<dyn CacheRegistry>,
        staging_prefix: &str,
    ) -> Self {
        let metadata = MetadataOverlay::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            root.clone(),
            staging_prefix,
        );
        let resolver = LocationResolver::new(Arc::clone(&store), Arc::clone(&registry));

        Self {
            root,
            working_dir: "/".to_string(),
            staging_prefix: staging_prefix.to_string(),
            store,
            registry,
            metadata,
            resolver,
        }
    }

    pub fn uri(&self) -> &OverlayRoot {
        &self.root
    }

    pub fn working_directory(&self) -> &str {
        &self.working_dir
    }

    /// Absolute paths are stored as given, relative ones are resolved
    /// against the current working directory with `.` and `..` removed
    pub fn set_working_directory(&mut self, path: &str) {
        self.working_dir = path::join(&self.working_dir, path);
        info!(working_dir = %self.working_dir, "Working directory changed");
    }

    fn qualify(&self, path: &str) -> String {
        path::join(&self.working_dir, path)
    }

    fn decode(&self, path: &str) -> Result<(String, Option<EntryId>), OverlayError> {
        Ok(path::decode(&self.qualify(path))?)
    }

    /// Start a new file; only allowed under the staging prefix
    pub async fn create(
        &self,
        path: &str,
        options: CreateOptions,
    ) -> Result<OutputStream, OverlayError> {
        let (raw_path, entry_id) = self.decode(path)?;

        if !path::is_under(&raw_path, &self.staging_prefix) {
            return Err(OverlayError::unsupported(format!(
                "create outside {}: {}",
                self.staging_prefix, path
            )));
        }
        if entry_id.is_some() {
            return Err(PolicyViolation::entry_suffix(path).into());
        }

        if !options.overwrite {
            match self.store.status(&raw_path).await {
                Ok(_) => return Err(StoreError::AlreadyExists(raw_path).into()),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!(path = %raw_path, overwrite = options.overwrite, "Creating file");
        Ok(OutputStream::new(Arc::clone(&self.store), raw_path, options))
    }

    pub fn append(&self, path: &str, _buffer_size: u32) -> Result<OutputStream, OverlayError> {
        Err(OverlayError::unsupported(format!("append: {}", path)))
    }

    /// Delete from the backing store. Any cache entry for the path is left alone.
    pub async fn delete(&self, path: &str, recursive: bool) -> Result<bool, OverlayError> {
        let (raw_path, _) = self.decode(path)?;
        let deleted = self.store.delete(&raw_path, recursive).await?;
        info!(path = %raw_path, recursive = recursive, deleted = deleted, "Deleted");
        Ok(deleted)
    }

    /// The legacy single-argument delete
    pub fn delete_non_recursive(&self, path: &str) -> Result<bool, OverlayError> {
        Err(OverlayError::unsupported(format!("non-recursive delete: {}", path)))
    }

    pub async fn mkdirs(&self, path: &str, permission: u16) -> Result<bool, OverlayError> {
        let (raw_path, entry_id) = self.decode(path)?;
        if entry_id.is_some() {
            return Err(PolicyViolation::entry_suffix(path).into());
        }

        let created = self.store.mkdirs(&raw_path, permission).await?;
        info!(path = %raw_path, permission = format!("{:o}", permission), "Made directories");
        Ok(created)
    }

    /// Rename in the backing store. A cache entry keyed by `src` is not moved.
    pub async fn rename(&self, src: &str, dst: &str) -> Result<bool, OverlayError> {
        let (raw_src, _) = self.decode(src)?;
        let (raw_dst, _) = self.decode(dst)?;
        let renamed = self.store.rename(&raw_src, &raw_dst).await?;
        info!(src = %raw_src, dst = %raw_dst, renamed = renamed, "Renamed");
        Ok(renamed)
    }

    pub async fn open(&self, path: &str, buffer_size: u32) -> Result<InputStream, OverlayError> {
        let (raw_path, entry_id) = self.decode(path)?;
        self.store.status(&raw_path).await?;
        let reader = StoreReader::new(Arc::clone(&self.store), raw_path, buffer_size);

        Ok(match entry_id {
            Some(id) => {
                InputStream::Cached(CachedReader::new(Arc::clone(&self.registry), id, reader))
            }
            None => InputStream::Store(reader),
        })
    }

    pub async fn get_file_status(&self, path: &str) -> Result<OverlayFileStatus, OverlayError> {
        let (raw_path, _) = self.decode(path)?;
        self.metadata.stat(&raw_path).await
    }

    pub async fn list_status(&self, path: &str) -> Result<Listing, OverlayError> {
        let (raw_path, _) = self.decode(path)?;
        self.metadata.list(&raw_path).await
    }

    pub async fn get_file_block_locations(
        &self,
        status: &OverlayFileStatus,
        start: u64,
        len: u64,
    ) -> Result<Vec<BlockLocation>, OverlayError> {
        self.resolver
            .locate(&status.path.to_string(), start, len)
            .await
    }
}
