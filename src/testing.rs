//! In-memory collaborators for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::path::EntryId;
use crate::registry::{CacheRegistry, RegistryError};
use crate::store::{BackingStore, BlockLocation, CreateOptions, FileStatus, StoreError};

pub const TEST_BLOCK_SIZE: u64 = 64;

#[derive(Debug, Clone)]
struct Node {
    status: FileStatus,
    data: Vec<u8>,
}

/// Backing store keeping nodes in insertion order
#[derive(Default)]
pub struct MemoryStore {
    nodes: Mutex<Vec<Node>>,
    pub status_calls: AtomicUsize,
    /// Paths whose `status` answers with a server error
    failing_status: Mutex<Vec<String>>,
    pub block_location_calls: Mutex<Vec<(String, u64, u64)>>,
}

fn status_for(path: &str, is_dir: bool, length: u64) -> FileStatus {
    FileStatus {
        path: path.to_string(),
        length,
        is_dir,
        replication: if is_dir { 0 } else { 3 },
        block_size: if is_dir { 0 } else { TEST_BLOCK_SIZE },
        modification_time: 1_320_171_722_771,
        access_time: 1_320_171_722_000,
        permission: if is_dir { 0o755 } else { 0o644 },
        owner: "hadoop".to_string(),
        group: "supergroup".to_string(),
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: &str, data: &[u8]) {
        self.nodes.lock().unwrap().push(Node {
            status: status_for(path, false, data.len() as u64),
            data: data.to_vec(),
        });
    }

    pub fn add_dir(&self, path: &str) {
        self.nodes.lock().unwrap().push(Node {
            status: status_for(path, true, 0),
            data: Vec::new(),
        });
    }

    pub fn fail_status(&self, path: &str) {
        self.failing_status.lock().unwrap().push(path.to_string());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.lock().unwrap().iter().any(|n| n.status.path == path)
    }

    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.status.path == path)
            .map(|n| n.data.clone())
    }

    fn find(&self, path: &str) -> Result<Node, StoreError> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.status.path == path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("File does not exist: {}", path)))
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn status(&self, path: &str) -> Result<FileStatus, StoreError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_status.lock().unwrap().iter().any(|p| p == path) {
            return Err(StoreError::Server(500, format!("status failed: {}", path)));
        }
        self.find(path).map(|n| n.status)
    }

    async fn list(&self, path: &str) -> Result<Vec<FileStatus>, StoreError> {
        let dir = self.find(path)?;
        if !dir.status.is_dir {
            return Ok(vec![dir.status]);
        }
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.status.path != path && parent_of(&n.status.path) == path)
            .map(|n| n.status.clone())
            .collect())
    }

    async fn read(
        &self,
        path: &str,
        range: Option<(u64, u64)>,
        _buffer_size: u32,
    ) -> Result<Vec<u8>, StoreError> {
        let node = self.find(path)?;
        let data = node.data;
        match range {
            None => Ok(data),
            Some((offset, length)) => {
                let start = (offset as usize).min(data.len());
                let end = start.saturating_add(length as usize).min(data.len());
                Ok(data[start..end].to_vec())
            }
        }
    }

    async fn write(
        &self,
        path: &str,
        data: Vec<u8>,
        options: &CreateOptions,
    ) -> Result<(), StoreError> {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(pos) = nodes.iter().position(|n| n.status.path == path) {
            if !options.overwrite {
                return Err(StoreError::AlreadyExists(path.to_string()));
            }
            nodes.remove(pos);
        }
        let mut status = status_for(path, false, data.len() as u64);
        status.permission = options.permission;
        status.replication = options.replication;
        nodes.push(Node { status, data });
        Ok(())
    }

    async fn delete(&self, path: &str, recursive: bool) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.lock().unwrap();
        let has_children = nodes
            .iter()
            .any(|n| n.status.path != path && crate::path::is_under(&n.status.path, path));
        if has_children && !recursive {
            return Err(StoreError::Request(format!("{} is non empty", path)));
        }
        let before = nodes.len();
        nodes.retain(|n| !crate::path::is_under(&n.status.path, path));
        Ok(nodes.len() != before)
    }

    async fn mkdirs(&self, path: &str, permission: u16) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.lock().unwrap();
        if !nodes.iter().any(|n| n.status.path == path) {
            let mut status = status_for(path, true, 0);
            status.permission = permission;
            nodes.push(Node {
                status,
                data: Vec::new(),
            });
        }
        Ok(true)
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<bool, StoreError> {
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.iter_mut().find(|n| n.status.path == src) {
            Some(node) => {
                node.status.path = dst.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn block_locations(
        &self,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<BlockLocation>, StoreError> {
        self.block_location_calls
            .lock()
            .unwrap()
            .push((path.to_string(), offset, length));

        let node = self.find(path)?;
        let mut locations = Vec::new();
        let mut block_start = 0;
        while block_start < node.status.length {
            let block_len = TEST_BLOCK_SIZE.min(node.status.length - block_start);
            let block_end = block_start + block_len;
            if block_end > offset && block_start < offset + length {
                let index = block_start / TEST_BLOCK_SIZE;
                locations.push(BlockLocation {
                    names: vec![format!("dn{}:9866", index)],
                    hosts: vec![format!("dn{}", index)],
                    offset: block_start,
                    length: block_len,
                });
            }
            block_start = block_end;
        }
        Ok(locations)
    }
}

/// Registry that deduplicates by raw path
pub struct MemoryRegistry {
    entries: Mutex<HashMap<String, EntryId>>,
    replicas: Mutex<HashMap<EntryId, Vec<String>>>,
    next_id: AtomicU64,
    pub fail_creates: bool,
    pub create_calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Ids are handed out from `first_id` upward
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            replicas: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(first_id),
            fail_creates: false,
            create_calls: AtomicUsize::new(0),
        }
    }

    /// A registry whose creations always yield the sentinel
    pub fn failing() -> Self {
        Self {
            fail_creates: true,
            ..Self::new()
        }
    }

    pub fn insert(&self, path: &str, id: u64) -> EntryId {
        let id = EntryId::new(id);
        self.entries.lock().unwrap().insert(path.to_string(), id);
        id
    }

    pub fn set_replicas(&self, id: EntryId, hosts: &[&str]) {
        self.replicas
            .lock()
            .unwrap()
            .insert(id, hosts.iter().map(|h| h.to_string()).collect());
    }
}

#[async_trait]
impl CacheRegistry for MemoryRegistry {
    async fn lookup(&self, path: &str) -> Result<Option<EntryId>, RegistryError> {
        Ok(self.entries.lock().unwrap().get(path).copied())
    }

    async fn create(&self, path: &str) -> Result<Option<EntryId>, RegistryError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates {
            return Ok(None);
        }
        // Let a concurrent caller reach `create` for the same path
        tokio::task::yield_now().await;
        let mut entries = self.entries.lock().unwrap();
        let id = *entries
            .entry(path.to_string())
            .or_insert_with(|| EntryId::new(self.next_id.fetch_add(1, Ordering::SeqCst)));
        Ok(Some(id))
    }

    async fn locations(&self, id: EntryId) -> Result<Vec<String>, RegistryError> {
        Ok(self
            .replicas
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Registry whose every call fails
pub struct UnreachableRegistry;

#[async_trait]
impl CacheRegistry for UnreachableRegistry {
    async fn lookup(&self, _path: &str) -> Result<Option<EntryId>, RegistryError> {
        Err(RegistryError::Unavailable("connection refused".to_string()))
    }

    async fn create(&self, _path: &str) -> Result<Option<EntryId>, RegistryError> {
        Err(RegistryError::Unavailable("connection refused".to_string()))
    }

    async fn locations(&self, _id: EntryId) -> Result<Vec<String>, RegistryError> {
        Err(RegistryError::Unavailable("connection refused".to_string()))
    }
}
