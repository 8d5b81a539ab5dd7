//! Metadata overlay and location resolution
//!
//! Composes backing store attributes with cache registry entries, and prefers
//! cache replica hosts over backing store block locations.

pub mod locations;
pub mod metadata;

pub use locations::{LocationResolver, FALLBACK_RANGE, WHOLE_FILE_LENGTH};
pub use metadata::{Listing, MetadataOverlay, OverlayFileStatus, UNBOUNDED_BLOCK_SIZE};
