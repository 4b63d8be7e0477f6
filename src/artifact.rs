//! Downloadable artifacts: encoded WAV bytes behind revocable URLs.
//!
//! [`ArtifactStore::create`] registers a blob and returns an
//! [`ArtifactHandle`] whose [`url`](ArtifactHandle::url) resolves through the
//! store until the handle is dropped. Dropping the handle revokes the URL, so
//! replacing `Option<ArtifactHandle>` with a new value, or unwinding out of a
//! function that owns one, always releases the old blob.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{Context, Result};
use tracing::debug;

/// MIME type of the voice-studio download.
pub const WAV_MIME: &str = "audio/wav";

const URL_PREFIX: &str = "blob:screenplay-studio/";

#[derive(Default)]
struct Registry {
    next_id: u64,
    blobs: HashMap<u64, Arc<[u8]>>,
}

/// Issues and resolves artifact URLs. Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct ArtifactStore {
    inner: Arc<Mutex<Registry>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A panic while holding the lock leaves the map itself consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `bytes` and return the owning handle.
    pub fn create(&self, bytes: Vec<u8>, mime: &'static str) -> ArtifactHandle {
        let bytes: Arc<[u8]> = bytes.into();
        let id = {
            let mut reg = self.registry();
            reg.next_id += 1;
            let id = reg.next_id;
            reg.blobs.insert(id, Arc::clone(&bytes));
            id
        };
        debug!(id, len = bytes.len(), mime, "artifact created");
        ArtifactHandle {
            id,
            url: format!("{}{}", URL_PREFIX, id),
            mime,
            bytes,
            store: self.clone(),
        }
    }

    /// Bytes behind `url`, or `None` once the owning handle is gone.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        let id: u64 = url.strip_prefix(URL_PREFIX)?.parse().ok()?;
        self.registry().blobs.get(&id).cloned()
    }

    /// Number of URLs currently resolvable.
    pub fn live_count(&self) -> usize {
        self.registry().blobs.len()
    }

    fn revoke(&self, id: u64) {
        if self.registry().blobs.remove(&id).is_some() {
            debug!(id, "artifact revoked");
        }
    }
}

/// Owning handle to one registered blob. Not `Clone`: exactly one owner
/// decides when the URL dies.
pub struct ArtifactHandle {
    id: u64,
    url: String,
    mime: &'static str,
    bytes: Arc<[u8]>,
    store: ArtifactStore,
}

impl ArtifactHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the blob to `dir/filename` and return the full path.
    pub fn save_as(&self, dir: &Path, filename: &str) -> Result<PathBuf> {
        let path = dir.join(filename);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("Cannot write download: {}", path.display()))?;
        debug!(id = self.id, path = %path.display(), "artifact saved");
        Ok(path)
    }
}

impl std::fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("url", &self.url)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Drop for ArtifactHandle {
    fn drop(&mut self) {
        self.store.revoke(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let store = ArtifactStore::new();
        let h = store.create(vec![1, 2, 3], WAV_MIME);
        assert!(h.url().starts_with("blob:"));
        assert_eq!(store.resolve(h.url()).as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(h.mime(), "audio/wav");
        assert_eq!(h.len(), 3);
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn test_drop_revokes() {
        let store = ArtifactStore::new();
        let h = store.create(vec![0; 4], WAV_MIME);
        let url = h.url().to_string();
        drop(h);
        assert!(store.resolve(&url).is_none());
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_replacing_releases_previous() {
        let store = ArtifactStore::new();
        let mut current = Some(store.create(vec![1], WAV_MIME));
        let old_url = current.as_ref().unwrap().url().to_string();

        current = Some(store.create(vec![2], WAV_MIME));
        assert!(store.resolve(&old_url).is_none());
        assert_eq!(store.live_count(), 1);
        assert_ne!(current.as_ref().unwrap().url(), old_url);
    }

    #[test]
    fn test_released_on_error_path() {
        fn fails(store: &ArtifactStore) -> Result<()> {
            let _h = store.create(vec![9; 8], WAV_MIME);
            anyhow::bail!("encoding failed later");
        }
        let store = ArtifactStore::new();
        assert!(fails(&store).is_err());
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_resolve_rejects_foreign_urls() {
        let store = ArtifactStore::new();
        let _h = store.create(vec![1], WAV_MIME);
        assert!(store.resolve("https://example.com/1").is_none());
        assert!(store.resolve("blob:screenplay-studio/not-a-number").is_none());
        assert!(store.resolve("blob:screenplay-studio/999").is_none());
    }

    #[test]
    fn test_save_as() {
        let store = ArtifactStore::new();
        let h = store.create(b"RIFF....".to_vec(), WAV_MIME);
        let dir = tempfile::tempdir().unwrap();
        let path = h.save_as(dir.path(), "voice_studio_output.wav").unwrap();
        assert_eq!(path.file_name().unwrap(), "voice_studio_output.wav");
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF....");
    }
}
