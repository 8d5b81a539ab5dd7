//! Backing store types
//!
//! Domain types shared by every `BackingStore` implementation, plus the
//! WebHDFS JSON shapes and their conversion.

use serde::{Deserialize, Deserializer};

use crate::path;

/// Deserialize a number that might be encoded as a string or null.
/// Some WebHDFS gateways return numeric fields as strings.
pub(crate) fn deserialize_flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct FlexibleU64Visitor;

    impl<'de> de::Visitor<'de> for FlexibleU64Visitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a u64, a string containing a u64, or null")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
            u64::try_from(value).map_err(|_| de::Error::custom("negative value for u64"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
            value.parse::<u64>().map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }
    }

    deserializer.deserialize_any(FlexibleU64Visitor)
}

/// Deserialize a POSIX permission given as an octal string ("755") or a number
fn deserialize_octal_permission<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct OctalVisitor;

    impl<'de> de::Visitor<'de> for OctalVisitor {
        type Value = u16;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("an octal permission string")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u16, E> {
            u16::from_str_radix(value, 8).map_err(de::Error::custom)
        }

        // Bare numbers are read as their octal digits, e.g. 755
        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u16, E> {
            u16::from_str_radix(&value.to_string(), 8).map_err(de::Error::custom)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u16, E> {
            u16::from_str_radix(&value.to_string(), 8).map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(OctalVisitor)
}

/// Status of a single file or directory in the backing store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// Absolute raw path
    pub path: String,
    pub length: u64,
    pub is_dir: bool,
    pub replication: u16,
    pub block_size: u64,
    /// Milliseconds since epoch
    pub modification_time: u64,
    /// Milliseconds since epoch
    pub access_time: u64,
    /// POSIX mode bits
    pub permission: u16,
    pub owner: String,
    pub group: String,
}

/// Host placement of a byte range of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLocation {
    pub names: Vec<String>,
    pub hosts: Vec<String>,
    pub offset: u64,
    pub length: u64,
}

/// Parameters for writing a new file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    pub permission: u16,
    pub overwrite: bool,
    pub buffer_size: u32,
    pub replication: u16,
    pub block_size: u64,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            permission: 0o644,
            overwrite: false,
            buffer_size: 4096,
            replication: 3,
            block_size: 128 * 1024 * 1024,
        }
    }
}

/// WebHDFS `FileStatus` object
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireFileStatus {
    /// Empty for GETFILESTATUS, child name for LISTSTATUS
    #[serde(default)]
    pub path_suffix: String,
    /// "FILE", "DIRECTORY" or "SYMLINK"
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub length: u64,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub replication: u64,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub block_size: u64,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub modification_time: u64,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub access_time: u64,
    #[serde(deserialize_with = "deserialize_octal_permission")]
    pub permission: u16,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub group: String,
}

impl WireFileStatus {
    /// Convert to a FileStatus rooted at `base`, the path the request was made for
    pub fn into_status(self, base: &str) -> FileStatus {
        let path = if self.path_suffix.is_empty() {
            base.to_string()
        } else {
            path::join(base, &self.path_suffix)
        };

        FileStatus {
            path,
            length: self.length,
            is_dir: self.kind == "DIRECTORY",
            replication: u16::try_from(self.replication).unwrap_or(u16::MAX),
            block_size: self.block_size,
            modification_time: self.modification_time,
            access_time: self.access_time,
            permission: self.permission,
            owner: self.owner,
            group: self.group,
        }
    }
}

/// Response from GETFILESTATUS
#[derive(Debug, Deserialize)]
pub(crate) struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    pub file_status: WireFileStatus,
}

/// Response from LISTSTATUS
#[derive(Debug, Deserialize)]
pub(crate) struct ListStatusResponse {
    #[serde(rename = "FileStatuses")]
    pub file_statuses: FileStatuses,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileStatuses {
    #[serde(rename = "FileStatus", default)]
    pub file_status: Vec<WireFileStatus>,
}

/// Response from MKDIRS, DELETE and RENAME
#[derive(Debug, Deserialize)]
pub(crate) struct BooleanResponse {
    pub boolean: bool,
}

/// Response from GETFILEBLOCKLOCATIONS
#[derive(Debug, Deserialize)]
pub(crate) struct BlockLocationsResponse {
    #[serde(rename = "BlockLocations")]
    pub block_locations: BlockLocations,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlockLocations {
    #[serde(rename = "BlockLocation", default)]
    pub block_location: Vec<WireBlockLocation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireBlockLocation {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub offset: u64,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub length: u64,
}

impl From<WireBlockLocation> for BlockLocation {
    fn from(wire: WireBlockLocation) -> Self {
        BlockLocation {
            names: wire.names,
            hosts: wire.hosts,
            offset: wire.offset,
            length: wire.length,
        }
    }
}
