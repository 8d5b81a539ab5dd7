//! Logical path handling
//!
//! A logical path is `scheme://host:port/raw/path[%<entry id>]`. The suffix
//! after the reserved separator names an entry in the cache registry.

pub mod codec;

pub use codec::{
    decode, encode, is_absolute, is_under, join, strip_authority, EntryId, LogicalPath,
    OverlayRoot, PathError, ENTRY_SEPARATOR,
};
