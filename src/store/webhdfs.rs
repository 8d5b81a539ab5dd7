//! WebHDFS client
//!
//! Talks to an HDFS NameNode over its REST gateway. Reads and writes follow the
//! NameNode's redirect to a DataNode.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use tracing::{debug, info};

use super::errors::StoreError;
use super::types::{
    BlockLocation, BlockLocationsResponse, BooleanResponse, CreateOptions, FileStatus,
    FileStatusResponse, ListStatusResponse,
};
use super::BackingStore;

/// REST prefix every file operation lives under
const WEBHDFS_PREFIX: &str = "/webhdfs/v1";

/// WebHDFS client bound to one NameNode
#[derive(Clone)]
pub struct WebHdfsStore {
    /// HTTP client for making requests
    http_client: Client,
    /// NameNode base URL, e.g. `http://namenode:9870`
    base_url: String,
    /// Value for the `user.name` query parameter
    user: Option<String>,
}

impl WebHdfsStore {
    /// Create a client for the NameNode at `base_url`
    pub fn new(base_url: &str, user: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Request(format!("Failed to create HTTP client: {}", e)))?;

        info!(base_url = base_url, user = ?user, "WebHDFS client ready");

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user,
        })
    }

    /// REST URL for a raw path, each segment percent-encoded
    fn file_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}{}/{}", self.base_url, WEBHDFS_PREFIX, encoded.join("/"))
    }

    /// Issue one WebHDFS operation and fail on any non-success status
    async fn call(
        &self,
        method: Method,
        path: &str,
        op: &str,
        params: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Response, StoreError> {
        let url = self.file_url(path);
        debug!(op = op, path = path, params = ?params, "WebHDFS request");

        let mut request = self
            .http_client
            .request(method, &url)
            .query(&[("op", op)])
            .query(params);
        if let Some(user) = &self.user {
            request = request.query(&[("user.name", user.as_str())]);
        }
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/octet-stream")
                .body(body);
        }

        let response = request.send().await.map_err(StoreError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            debug!(op = op, path = path, status = status, "WebHDFS request failed");
            return Err(StoreError::from_status(status, &body));
        }

        Ok(response)
    }

    async fn call_json<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        op: &str,
        params: &[(&str, String)],
    ) -> Result<T, StoreError> {
        self.call(method, path, op, params, None)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("{} {}: {}", op, path, e)))
    }
}

#[async_trait]
impl BackingStore for WebHdfsStore {
    async fn status(&self, path: &str) -> Result<FileStatus, StoreError> {
        let resp: FileStatusResponse = self
            .call_json(Method::GET, path, "GETFILESTATUS", &[])
            .await?;
        Ok(resp.file_status.into_status(path))
    }

    async fn list(&self, path: &str) -> Result<Vec<FileStatus>, StoreError> {
        let resp: ListStatusResponse = self
            .call_json(Method::GET, path, "LISTSTATUS", &[])
            .await?;

        let statuses: Vec<FileStatus> = resp
            .file_statuses
            .file_status
            .into_iter()
            .map(|s| s.into_status(path))
            .collect();

        debug!(path = path, count = statuses.len(), "Listed directory from WebHDFS");
        Ok(statuses)
    }

    async fn read(
        &self,
        path: &str,
        range: Option<(u64, u64)>,
        buffer_size: u32,
    ) -> Result<Vec<u8>, StoreError> {
        let mut params = vec![("buffersize", buffer_size.to_string())];
        if let Some((offset, length)) = range {
            params.push(("offset", offset.to_string()));
            params.push(("length", length.to_string()));
        }

        let bytes = self
            .call(Method::GET, path, "OPEN", &params, None)
            .await?
            .bytes()
            .await
            .map_err(StoreError::from_transport)?;

        debug!(path = path, range = ?range, size = bytes.len(), "Read file from WebHDFS");
        Ok(bytes.to_vec())
    }

    async fn write(
        &self,
        path: &str,
        data: Vec<u8>,
        options: &CreateOptions,
    ) -> Result<(), StoreError> {
        let size = data.len();
        let params = [
            ("overwrite", options.overwrite.to_string()),
            ("blocksize", options.block_size.to_string()),
            ("replication", options.replication.to_string()),
            ("permission", format!("{:o}", options.permission)),
            ("buffersize", options.buffer_size.to_string()),
        ];

        self.call(Method::PUT, path, "CREATE", &params, Some(data))
            .await?;

        info!(path = path, size = size, "File written to WebHDFS");
        Ok(())
    }

    async fn delete(&self, path: &str, recursive: bool) -> Result<bool, StoreError> {
        let resp: BooleanResponse = self
            .call_json(
                Method::DELETE,
                path,
                "DELETE",
                &[("recursive", recursive.to_string())],
            )
            .await?;
        Ok(resp.boolean)
    }

    async fn mkdirs(&self, path: &str, permission: u16) -> Result<bool, StoreError> {
        let resp: BooleanResponse = self
            .call_json(
                Method::PUT,
                path,
                "MKDIRS",
                &[("permission", format!("{:o}", permission))],
            )
            .await?;
        Ok(resp.boolean)
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<bool, StoreError> {
        let resp: BooleanResponse = self
            .call_json(
                Method::PUT,
                src,
                "RENAME",
                &[("destination", dst.to_string())],
            )
            .await?;
        Ok(resp.boolean)
    }

    async fn block_locations(
        &self,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<BlockLocation>, StoreError> {
        let resp: BlockLocationsResponse = self
            .call_json(
                Method::GET,
                path,
                "GETFILEBLOCKLOCATIONS",
                &[("offset", offset.to_string()), ("length", length.to_string())],
            )
            .await?;

        Ok(resp
            .block_locations
            .block_location
            .into_iter()
            .map(BlockLocation::from)
            .collect())
    }
}
