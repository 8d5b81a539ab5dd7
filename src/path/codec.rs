//! Path codec
//!
//! Encodes and decodes the cache entry suffix carried by logical paths.

use std::fmt;

use url::Url;

/// Reserved character separating the raw path from the entry id
pub const ENTRY_SEPARATOR: char = '%';

/// Handle into the cache registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Interpret a raw registry answer. Anything `<= 0` is the "no entry" sentinel.
    pub fn from_registry(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().filter(|id| *id > 0).map(Self)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Malformed entry id `{suffix}` in path: {path}")]
    MalformedEntryId { path: String, suffix: String },

    #[error("Invalid filesystem URI: {0}")]
    InvalidUri(String),
}

/// Scheme and authority every logical path is rendered under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRoot {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl OverlayRoot {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    /// Build the root from a filesystem URI such as `tachyon://master:19998/`.
    ///
    /// Host and port are both required; they also address the cache registry.
    pub fn from_uri(uri: &str) -> Result<Self, PathError> {
        let parsed = Url::parse(uri).map_err(|e| PathError::InvalidUri(format!("{}: {}", uri, e)))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| PathError::InvalidUri(format!("{}: missing host", uri)))?;
        let port = parsed
            .port()
            .ok_or_else(|| PathError::InvalidUri(format!("{}: missing port", uri)))?;

        Ok(Self::new(parsed.scheme(), host, port))
    }

    /// Render a raw path, with an optional entry id, under this root
    pub fn logical(&self, raw_path: &str, entry_id: Option<EntryId>) -> LogicalPath {
        LogicalPath {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            raw_path: raw_path.to_string(),
            entry_id,
        }
    }
}

impl fmt::Display for OverlayRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}/", self.scheme, self.host, self.port)
    }
}

/// A fully qualified overlay path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPath {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub raw_path: String,
    pub entry_id: Option<EntryId>,
}

impl LogicalPath {
    /// The path component including any entry suffix
    pub fn path(&self) -> String {
        encode(&self.raw_path, self.entry_id)
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}{}",
            self.scheme,
            self.host,
            self.port,
            self.path()
        )
    }
}

/// Split `scheme://authority` off a path. Paths without one get an empty authority.
fn split_authority(path: &str) -> (&str, &str) {
    match path.find("://") {
        Some(idx) => {
            let after = idx + 3;
            match path[after..].find('/') {
                Some(slash) => path.split_at(after + slash),
                None => (path, "/"),
            }
        }
        None => ("", path),
    }
}

/// Drop `scheme://authority` from a path, leaving the absolute path component
pub fn strip_authority(path: &str) -> &str {
    split_authority(path).1
}

/// Split a path into its raw path and optional entry id
pub fn decode(path: &str) -> Result<(String, Option<EntryId>), PathError> {
    let path = strip_authority(path);

    match path.split_once(ENTRY_SEPARATOR) {
        None => Ok((path.to_string(), None)),
        Some((raw, suffix)) => {
            // `u64::from_str` accepts a leading '+', the suffix must be bare digits
            if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PathError::MalformedEntryId {
                    path: path.to_string(),
                    suffix: suffix.to_string(),
                });
            }
            let id = suffix.parse::<u64>().map_err(|_| PathError::MalformedEntryId {
                path: path.to_string(),
                suffix: suffix.to_string(),
            })?;
            Ok((raw.to_string(), Some(EntryId(id))))
        }
    }
}

/// Append the entry suffix to a raw path
pub fn encode(raw_path: &str, entry_id: Option<EntryId>) -> String {
    match entry_id {
        Some(id) => format!("{}{}{}", raw_path, ENTRY_SEPARATOR, id),
        None => raw_path.to_string(),
    }
}

pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.contains("://")
}

/// Resolve `child` against `base`; absolute children are returned as is.
///
/// `.` segments are dropped and `..` pops one segment, never above `/`.
pub fn join(base: &str, child: &str) -> String {
    if is_absolute(child) {
        return child.to_string();
    }

    let (authority, base_path) = split_authority(base);
    let mut segments: Vec<&str> = Vec::new();
    for segment in base_path.split('/').chain(child.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    format!("{}/{}", authority, segments.join("/"))
}

/// Whether `raw_path` equals `prefix` or lies below it
pub fn is_under(raw_path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match raw_path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
