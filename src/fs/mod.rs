//! Caller-facing filesystem

pub mod handles;
pub mod overlayfs;

pub use handles::{InputStream, OutputStream};
pub use overlayfs::OverlayFileSystem;
