//! Asset store collaborator.
//!
//! The renderer never touches the photo library directly. It fetches source
//! bytes, asks for write permission and saves exports through [`AssetStore`].
//! [`MemoryAssetStore`] keeps everything in memory and records what was
//! asked of it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::Orientation;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No asset with id {0}")]
    NotFound(String),
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// Opaque reference to a source asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AssetRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Encoded source bytes plus the orientation the store knows about.
///
/// When `orientation` is `None`, the EXIF orientation in `bytes` is used.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAsset {
    pub bytes: Vec<u8>,
    pub orientation: Option<Orientation>,
}

impl SourceAsset {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            orientation: None,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }
}

/// Photo library operations the renderer depends on.
///
/// Implementations are shared across worker threads.
pub trait AssetStore: Send + Sync {
    /// Fetch source bytes and orientation for an asset.
    fn fetch(&self, asset: &AssetRef) -> Result<SourceAsset, StoreError>;

    /// Ask for permission to add a new asset. `Ok(false)` means denied.
    fn request_write_permission(&self) -> Result<bool, StoreError>;

    /// Persist encoded bytes as a new asset.
    fn write_new_asset(&self, bytes: &[u8]) -> Result<(), StoreError>;
}

/// In-memory store that records permission requests and write attempts.
///
/// Uses Mutex and atomics (not RefCell) so it can be shared across workers.
#[derive(Debug)]
pub struct MemoryAssetStore {
    assets: Mutex<HashMap<AssetRef, SourceAsset>>,
    written: Mutex<Vec<Vec<u8>>>,
    grant_permission: AtomicBool,
    reject_writes: AtomicBool,
    permission_requests: AtomicUsize,
    write_attempts: AtomicUsize,
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self {
            assets: Mutex::new(HashMap::new()),
            written: Mutex::new(Vec::new()),
            grant_permission: AtomicBool::new(true),
            reject_writes: AtomicBool::new(false),
            permission_requests: AtomicUsize::new(0),
            write_attempts: AtomicUsize::new(0),
        }
    }
}

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<AssetRef>, asset: SourceAsset) {
        lock(&self.assets).insert(id.into(), asset);
    }

    /// Grant or deny future write permission requests.
    pub fn set_permission(&self, granted: bool) {
        self.grant_permission.store(granted, Ordering::SeqCst);
    }

    /// Make future writes fail with [`StoreError::WriteRejected`].
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    /// Number of calls to `write_new_asset`, successful or not.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Bytes of every successful write, oldest first.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.written).clone()
    }
}

impl AssetStore for MemoryAssetStore {
    fn fetch(&self, asset: &AssetRef) -> Result<SourceAsset, StoreError> {
        lock(&self.assets)
            .get(asset)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(asset.to_string()))
    }

    fn request_write_permission(&self) -> Result<bool, StoreError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.grant_permission.load(Ordering::SeqCst))
    }

    fn write_new_asset(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("store is read-only".into()));
        }
        lock(&self.written).push(bytes.to_vec());
        Ok(())
    }
}
