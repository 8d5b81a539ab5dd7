//! Cache registry HTTP client
//!
//! JSON over HTTP to the registry master named by the filesystem URI.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::errors::RegistryError;
use super::types::{FileIdResponse, LocationsRequest, LocationsResponse, PathRequest};
use super::CacheRegistry;
use crate::path::EntryId;

/// Client for the registry master at `host:port`
#[derive(Clone)]
pub struct HttpRegistryClient {
    http_client: Client,
    /// e.g. `http://master:19998`
    base_url: String,
}

impl HttpRegistryClient {
    /// Bind a client to the registry master
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, RegistryError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: format!("http://{}:{}", host, port),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, RegistryError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(RegistryError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::from_status(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| RegistryError::Decode(format!("{}: {}", endpoint, e)))
    }
}

#[async_trait]
impl CacheRegistry for HttpRegistryClient {
    async fn lookup(&self, path: &str) -> Result<Option<EntryId>, RegistryError> {
        let resp: FileIdResponse = self.post("/v1/files/id", &PathRequest { path }).await?;
        debug!(path = path, file_id = resp.file_id, "Registry lookup");
        Ok(resp.entry_id())
    }

    async fn create(&self, path: &str) -> Result<Option<EntryId>, RegistryError> {
        let resp: FileIdResponse = self.post("/v1/files/create", &PathRequest { path }).await?;
        debug!(path = path, file_id = resp.file_id, "Registry create");
        Ok(resp.entry_id())
    }

    async fn locations(&self, id: EntryId) -> Result<Vec<String>, RegistryError> {
        let resp: LocationsResponse = self
            .post("/v1/files/locations", &LocationsRequest { file_id: id.get() })
            .await?;
        let hosts = resp.hosts();
        debug!(entry_id = %id, replicas = hosts.len(), "Registry locations");
        Ok(hosts)
    }
}
