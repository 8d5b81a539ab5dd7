//! Tachyon overlay - cache-aware view over an HDFS backing store
//!
//! Logical paths may carry a cache registry entry id. Status queries attach
//! (and lazily create) entries, location queries prefer cache replicas, and
//! everything else is delegated to the backing store.

pub mod config;
pub mod errors;
pub mod fs;
pub mod overlay;
pub mod path;
pub mod registry;
pub mod store;

#[cfg(test)]
mod testing;

pub use errors::{OverlayError, PolicyViolation};
pub use fs::OverlayFileSystem;
