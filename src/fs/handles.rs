//! Stream handles
//!
//! `open` hands out an `InputStream`, `create` an `OutputStream`. Output is
//! buffered and written to the backing store on `close`; dropping an unclosed
//! stream with buffered bytes discards them with a warning.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::path::EntryId;
use crate::registry::{CacheRegistry, RegistryError};
use crate::store::{BackingStore, CreateOptions, StoreError};

/// Sequential reader over one backing store file
pub struct StoreReader {
    store: Arc<dyn BackingStore>,
    /// Raw path of the file
    path: String,
    buffer_size: u32,
    position: u64,
}

impl StoreReader {
    pub fn new(store: Arc<dyn BackingStore>, path: String, buffer_size: u32) -> Self {
        Self {
            store,
            path,
            buffer_size,
            position: 0,
        }
    }

    /// Read up to `len` bytes at the current position. Empty means end of file.
    pub async fn read(&mut self, len: u64) -> Result<Vec<u8>, StoreError> {
        let data = self
            .store
            .read(&self.path, Some((self.position, len)), self.buffer_size)
            .await?;
        self.position += data.len() as u64;
        Ok(data)
    }

    /// Read the whole file regardless of position
    pub async fn read_all(&self) -> Result<Vec<u8>, StoreError> {
        self.store.read(&self.path, None, self.buffer_size).await
    }

    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Reader bound to a cache registry entry
///
/// Bytes come from the backing store copy of the raw path; the registry side
/// only answers where the replicas live.
pub struct CachedReader {
    registry: Arc<dyn CacheRegistry>,
    entry_id: EntryId,
    inner: StoreReader,
}

impl CachedReader {
    pub fn new(registry: Arc<dyn CacheRegistry>, entry_id: EntryId, inner: StoreReader) -> Self {
        Self {
            registry,
            entry_id,
            inner,
        }
    }

    pub async fn replica_hosts(&self) -> Result<Vec<String>, RegistryError> {
        self.registry.locations(self.entry_id).await
    }
}

/// An open file
pub enum InputStream {
    Store(StoreReader),
    Cached(CachedReader),
}

impl InputStream {
    fn reader(&self) -> &StoreReader {
        match self {
            InputStream::Store(reader) => reader,
            InputStream::Cached(cached) => &cached.inner,
        }
    }

    fn reader_mut(&mut self) -> &mut StoreReader {
        match self {
            InputStream::Store(reader) => reader,
            InputStream::Cached(cached) => &mut cached.inner,
        }
    }

    pub fn entry_id(&self) -> Option<EntryId> {
        match self {
            InputStream::Store(_) => None,
            InputStream::Cached(cached) => Some(cached.entry_id),
        }
    }

    pub fn raw_path(&self) -> &str {
        &self.reader().path
    }

    pub fn buffer_size(&self) -> u32 {
        self.reader().buffer_size
    }

    pub async fn read(&mut self, len: u64) -> Result<Vec<u8>, StoreError> {
        self.reader_mut().read(len).await
    }

    pub async fn read_all(&self) -> Result<Vec<u8>, StoreError> {
        self.reader().read_all().await
    }

    pub fn seek(&mut self, position: u64) {
        self.reader_mut().seek(position)
    }

    pub fn position(&self) -> u64 {
        self.reader().position()
    }
}

/// A file being written
pub struct OutputStream {
    store: Arc<dyn BackingStore>,
    /// Raw path of the file
    path: String,
    options: CreateOptions,
    buffer: Vec<u8>,
}

impl OutputStream {
    pub fn new(store: Arc<dyn BackingStore>, path: String, options: CreateOptions) -> Self {
        Self {
            store,
            path,
            options,
            buffer: Vec::new(),
        }
    }

    pub fn write(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn raw_path(&self) -> &str {
        &self.path
    }

    /// Hand the buffered bytes to the backing store
    pub async fn close(mut self) -> Result<(), StoreError> {
        let data = std::mem::take(&mut self.buffer);
        debug!(path = %self.path, size = data.len(), "Closing output stream");
        self.store.write(&self.path, data, &self.options).await
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            warn!(
                path = %self.path,
                size = self.buffer.len(),
                "Output stream dropped without close, buffered data discarded"
            );
        }
    }
}
