//! Backing store access
//!
//! The durable filesystem of record. Every path handed to a `BackingStore`
//! is a raw path: no scheme, no authority, no entry suffix.

pub mod errors;
pub mod types;
pub mod webhdfs;

use async_trait::async_trait;

pub use errors::StoreError;
pub use types::{BlockLocation, CreateOptions, FileStatus};
pub use webhdfs::WebHdfsStore;

/// Operations the overlay needs from the backing filesystem
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn status(&self, path: &str) -> Result<FileStatus, StoreError>;

    /// Children of a directory, in the store's own order
    async fn list(&self, path: &str) -> Result<Vec<FileStatus>, StoreError>;

    /// Read file bytes, optionally limited to `(offset, length)`
    async fn read(
        &self,
        path: &str,
        range: Option<(u64, u64)>,
        buffer_size: u32,
    ) -> Result<Vec<u8>, StoreError>;

    async fn write(
        &self,
        path: &str,
        data: Vec<u8>,
        options: &CreateOptions,
    ) -> Result<(), StoreError>;

    async fn delete(&self, path: &str, recursive: bool) -> Result<bool, StoreError>;

    async fn mkdirs(&self, path: &str, permission: u16) -> Result<bool, StoreError>;

    async fn rename(&self, src: &str, dst: &str) -> Result<bool, StoreError>;

    /// Locations of the blocks covering `[offset, offset + length)`
    async fn block_locations(
        &self,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<BlockLocation>, StoreError>;
}
