//! Location resolution
//!
//! Cache replica hosts win over backing store block locations. The registry
//! has no sub-file granularity, so a cached file is reported as one synthetic
//! block covering the whole file.

use std::sync::Arc;

use tracing::debug;

use crate::errors::OverlayError;
use crate::path;
use crate::registry::CacheRegistry;
use crate::store::{BackingStore, BlockLocation};

/// Length of the synthetic whole-file block
pub const WHOLE_FILE_LENGTH: u64 = i64::MAX as u64;

/// `(offset, length)` queried from the backing store on fallback.
/// Only the first block is ever resolved this way.
pub const FALLBACK_RANGE: (u64, u64) = (0, 1);

pub struct LocationResolver {
    store: Arc<dyn BackingStore>,
    registry: Arc<dyn CacheRegistry>,
}

impl LocationResolver {
    pub fn new(store: Arc<dyn BackingStore>, registry: Arc<dyn CacheRegistry>) -> Self {
        Self { store, registry }
    }

    /// Block locations for a logical path
    ///
    /// `start` and `len` do not narrow the answer: a cached file yields its
    /// single synthetic block, an uncached one its first backing store block.
    pub async fn locate(
        &self,
        logical_path: &str,
        start: u64,
        len: u64,
    ) -> Result<Vec<BlockLocation>, OverlayError> {
        let (raw_path, entry_id) = path::decode(logical_path)?;

        if let Some(id) = entry_id {
            let hosts = self.registry.locations(id).await?;
            if !hosts.is_empty() {
                debug!(path = %raw_path, entry_id = %id, replicas = hosts.len(), "Resolved cache replicas");
                return Ok(vec![BlockLocation {
                    names: hosts.clone(),
                    hosts,
                    offset: 0,
                    length: WHOLE_FILE_LENGTH,
                }]);
            }
        }

        let (offset, length) = FALLBACK_RANGE;
        debug!(
            path = %raw_path,
            requested_start = start,
            requested_len = len,
            "Falling back to backing store block locations"
        );
        Ok(self.store.block_locations(&raw_path, offset, length).await?)
    }
}
