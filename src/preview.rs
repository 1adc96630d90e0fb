//! Scoped previews of locally selected files.
//!
//! DESIGN
//! ======
//! A view that shows a thumbnail of a file the user just picked acquires a
//! `PreviewLease` from a `PreviewStore`. The lease owns the preview bytes
//! and a `preview://` handle; dropping the lease releases the entry. The
//! controller's data model never sees previews.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::draft::LocalFile;

#[derive(Debug)]
struct Entry {
    name: String,
    content_type: String,
    bytes: Arc<[u8]>,
}

/// Registry of live previews.
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    inner: Arc<Mutex<HashMap<Uuid, Entry>>>,
}

impl PreviewStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a preview for `file`. The entry lives as long as the lease.
    #[must_use]
    pub fn acquire(&self, file: &LocalFile) -> PreviewLease {
        let id = Uuid::new_v4();
        let bytes: Arc<[u8]> = Arc::from(file.bytes.as_slice());
        let entry = Entry { name: file.name.clone(), content_type: file.content_type.clone(), bytes: bytes.clone() };
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entry);
        PreviewLease { id, name: file.name.clone(), bytes, store: self.clone() }
    }

    /// Acquire one lease per file, in order.
    #[must_use]
    pub fn acquire_all(&self, files: &[LocalFile]) -> Vec<PreviewLease> {
        files.iter().map(|f| self.acquire(f)).collect()
    }

    /// Resolve a `preview://` URI to its content type and bytes while the
    /// lease is still held.
    #[must_use]
    pub fn resolve(&self, uri: &str) -> Option<(String, Arc<[u8]>)> {
        let id = uri.strip_prefix("preview://")?.split('/').next()?;
        let id = Uuid::parse_str(id).ok()?;
        let entries = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&id).map(|e| (e.content_type.clone(), e.bytes.clone()))
    }

    /// Number of previews currently held.
    #[must_use]
    pub fn active(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// File names of the previews currently held.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let entries = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.values().map(|e| e.name.clone()).collect();
        names.sort();
        names
    }

    fn release(&self, id: Uuid) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// A held preview. Released on drop.
#[derive(Debug)]
pub struct PreviewLease {
    id: Uuid,
    name: String,
    bytes: Arc<[u8]>,
    store: PreviewStore,
}

impl PreviewLease {
    /// Handle the view can embed; resolvable through the store while held.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("preview://{}/{}", self.id, self.name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for PreviewLease {
    fn drop(&mut self) {
        self.store.release(self.id);
    }
}

#[cfg(test)]
#[path = "preview_test.rs"]
mod tests;
