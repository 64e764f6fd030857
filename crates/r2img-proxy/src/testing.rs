//! Test doubles shared by the ingest, retrieval and server tests

use async_trait::async_trait;
use blob_store_client::{BlobStoreError, RemoteStore, CANONICAL_EXTENSION};
use disk_blob_cache::{CacheEntry, CacheError, CacheStore, DiskCache};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory remote store that counts every call
#[derive(Default)]
pub struct CountingRemote {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub uploads: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl CountingRemote {
    pub fn with_object(name: &str, data: &[u8]) -> Self {
        let remote = Self::default();
        remote
            .objects
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
        remote
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for CountingRemote {
    async fn upload(&self, data: Vec<u8>, token: &str) -> blob_store_client::Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}.{}", token, CANONICAL_EXTENSION);
        self.objects.lock().unwrap().insert(name.clone(), data);
        Ok(name)
    }

    async fn fetch(&self, name: &str) -> blob_store_client::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| BlobStoreError::Status {
                status: 404,
                url: format!("mock://i/{}", name),
            })
    }
}

/// Disk cache whose writes fail as if the device were full, and which counts writes
pub struct FullDiskStore {
    pub inner: DiskCache,
    pub writes: AtomicUsize,
}

impl FullDiskStore {
    pub fn new(inner: DiskCache) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CacheStore for FullDiskStore {
    async fn exists(&self, key: &str) -> bool {
        self.inner.exists(key).await
    }

    async fn read(&self, key: &str) -> disk_blob_cache::Result<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn write(&self, _key: &str, _data: &[u8]) -> disk_blob_cache::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::from_write(io::Error::from(
            io::ErrorKind::StorageFull,
        )))
    }

    async fn delete(&self, key: &str) -> disk_blob_cache::Result<()> {
        self.inner.delete(key).await
    }

    async fn list_all(&self) -> disk_blob_cache::Result<Vec<CacheEntry>> {
        self.inner.list_all().await
    }
}

/// Counts writes that reach the wrapped disk cache
pub struct CountingStore {
    pub inner: DiskCache,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: DiskCache) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn exists(&self, key: &str) -> bool {
        self.inner.exists(key).await
    }

    async fn read(&self, key: &str) -> disk_blob_cache::Result<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, data: &[u8]) -> disk_blob_cache::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(key, data).await
    }

    async fn delete(&self, key: &str) -> disk_blob_cache::Result<()> {
        self.inner.delete(key).await
    }

    async fn list_all(&self) -> disk_blob_cache::Result<Vec<CacheEntry>> {
        self.inner.list_all().await
    }
}

/// Reports every key as present but loses the entry before it can be read,
/// as when an eviction pass deletes it in between
pub struct EvictedBeforeReadStore {
    pub inner: DiskCache,
}

#[async_trait]
impl CacheStore for EvictedBeforeReadStore {
    async fn exists(&self, _key: &str) -> bool {
        true
    }

    async fn read(&self, key: &str) -> disk_blob_cache::Result<Vec<u8>> {
        Err(CacheError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, data: &[u8]) -> disk_blob_cache::Result<()> {
        self.inner.write(key, data).await
    }

    async fn delete(&self, key: &str) -> disk_blob_cache::Result<()> {
        self.inner.delete(key).await
    }

    async fn list_all(&self) -> disk_blob_cache::Result<Vec<CacheEntry>> {
        self.inner.list_all().await
    }
}

/// Disk cache whose writes fail with a permission error, and which counts writes
pub struct DeniedWriteStore {
    pub inner: DiskCache,
    pub writes: AtomicUsize,
}

impl DeniedWriteStore {
    pub fn new(inner: DiskCache) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CacheStore for DeniedWriteStore {
    async fn exists(&self, key: &str) -> bool {
        self.inner.exists(key).await
    }

    async fn read(&self, key: &str) -> disk_blob_cache::Result<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn write(&self, _key: &str, _data: &[u8]) -> disk_blob_cache::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::from_write(io::Error::from(
            io::ErrorKind::PermissionDenied,
        )))
    }

    async fn delete(&self, key: &str) -> disk_blob_cache::Result<()> {
        self.inner.delete(key).await
    }

    async fn list_all(&self) -> disk_blob_cache::Result<Vec<CacheEntry>> {
        self.inner.list_all().await
    }
}
