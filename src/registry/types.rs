//! Cache registry wire types

use serde::{Deserialize, Deserializer, Serialize};

use crate::path::EntryId;
use crate::store::types::deserialize_flexible_u64;

/// Deserialize a signed number that might be encoded as a string.
/// The registry answers `-1` for "no entry".
fn deserialize_flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct FlexibleI64Visitor;

    impl<'de> de::Visitor<'de> for FlexibleI64Visitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("an i64 or a string containing an i64")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
            i64::try_from(value).map_err(|_| de::Error::custom("value out of range for i64"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
            value.parse::<i64>().map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(FlexibleI64Visitor)
}

/// Request body for id lookup and entry creation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PathRequest<'a> {
    pub path: &'a str,
}

/// Request body for replica lookup
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LocationsRequest {
    pub file_id: u64,
}

/// Response carrying a file id, possibly the `-1` sentinel
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileIdResponse {
    #[serde(deserialize_with = "deserialize_flexible_i64")]
    pub file_id: i64,
}

impl FileIdResponse {
    pub fn entry_id(&self) -> Option<EntryId> {
        EntryId::from_registry(self.file_id)
    }
}

/// A worker holding a replica
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetAddress {
    pub host: String,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub port: u64,
}

/// Response from the replica location lookup
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LocationsResponse {
    #[serde(default)]
    pub locations: Option<Vec<NetAddress>>,
}

impl LocationsResponse {
    /// Replica host names in registry order
    pub fn hosts(self) -> Vec<String> {
        self.locations
            .unwrap_or_default()
            .into_iter()
            .map(|address| address.host)
            .collect()
    }
}
