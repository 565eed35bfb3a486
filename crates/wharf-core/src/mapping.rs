//! Durable component-id -> install-location mapping.
//!
//! The mapping file is the only record of what is installed once a
//! component's content is gone (a deleted component syncs with nothing but
//! its uuid), so uninstall treats it as the source of truth. Writes are
//! debounced: bursts of install/uninstall mutations coalesce into a single
//! serialized write of the state as it stands when the timer fires.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Quiescence window for coalescing mapping writes.
pub const SAVE_DEBOUNCE: Duration = Duration::from_secs(3);

/// A single recorded install location, relative to the user-data root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub location: String,
}

type Mapping = HashMap<String, MappingEntry>;

/// Store owning the in-memory mapping and its durable file.
///
/// Cheap to clone; all clones share one state. The file is loaded once on
/// first access (concurrent callers wait on the same load) and every
/// mutation schedules a debounced write. Abrupt process termination can
/// lose the last window's mutations; callers that need durability at exit
/// use [`MappingStore::flush`].
#[derive(Clone)]
pub struct MappingStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    debounce: Duration,
    state: Mutex<Option<Mapping>>,
    pending_save: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_debounce(path, SAVE_DEBOUNCE)
    }

    /// Construct with a custom quiescence window.
    pub fn with_debounce(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                debounce,
                state: Mutex::new(None),
                pending_save: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// Snapshot of the current mapping, loading the file on first use.
    pub async fn get(&self) -> HashMap<String, MappingEntry> {
        let mut state = self.inner.state.lock().await;
        self.inner.ensure_loaded(&mut state).await.clone()
    }

    /// Recorded install location for a component, if any.
    pub async fn location_of(&self, id: &str) -> Option<String> {
        let mut state = self.inner.state.lock().await;
        self.inner
            .ensure_loaded(&mut state)
            .await
            .get(id)
            .map(|entry| entry.location.clone())
    }

    /// Record (or update) a component's install location and schedule a
    /// debounced save.
    pub async fn record(&self, id: &str, location: &str) {
        {
            let mut state = self.inner.state.lock().await;
            self.inner.ensure_loaded(&mut state).await.insert(
                id.to_string(),
                MappingEntry {
                    location: location.to_string(),
                },
            );
        }
        self.schedule_save();
    }

    /// Remove a component's entry. Removing an unknown id is a no-op and
    /// schedules no write.
    pub async fn remove(&self, id: &str) -> Option<MappingEntry> {
        let removed = {
            let mut state = self.inner.state.lock().await;
            self.inner.ensure_loaded(&mut state).await.remove(id)
        };
        if removed.is_some() {
            self.schedule_save();
        }
        removed
    }

    /// Write any pending mutations immediately, cancelling the timer.
    /// A no-op when nothing is pending.
    pub async fn flush(&self) {
        let pending = self.inner.pending_save.lock().take();
        if let Some(handle) = pending {
            handle.abort();
            self.inner.write_now().await;
        }
    }

    fn schedule_save(&self) {
        let inner = Arc::clone(&self.inner);
        let mut pending = self.inner.pending_save.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            inner.write_now().await;
        }));
    }
}

impl Inner {
    async fn ensure_loaded<'a>(&self, state: &'a mut Option<Mapping>) -> &'a mut Mapping {
        if state.is_none() {
            *state = Some(self.load_from_disk().await);
        }
        state.get_or_insert_with(Mapping::new)
    }

    /// A missing or corrupt file degrades to "nothing known installed".
    async fn load_from_disk(&self) -> Mapping {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(mapping) => mapping,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Unreadable mapping file, starting empty");
                    Mapping::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Mapping::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read mapping file, starting empty");
                Mapping::new()
            }
        }
    }

    async fn write_now(&self) {
        let snapshot = self.state.lock().await.clone().unwrap_or_default();
        let json = match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to encode mapping");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %self.path.display(), error = %e, "Mapping file save error");
                return;
            }
        }
        match tokio::fs::write(&self.path, json).await {
            Ok(()) => debug!(path = %self.path.display(), entries = snapshot.len(), "Mapping file saved"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Mapping file save error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DEBOUNCE: Duration = Duration::from_millis(50);

    fn store_in(dir: &std::path::Path) -> MappingStore {
        MappingStore::with_debounce(dir.join("mapping.json"), TEST_DEBOUNCE)
    }

    async fn wait_past_debounce() {
        tokio::time::sleep(TEST_DEBOUNCE * 4).await;
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.get().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mapping.json"), b"{not json").unwrap();
        let store = store_in(dir.path());
        assert!(store.get().await.is_empty());
    }

    #[tokio::test]
    async fn test_debounce_coalesces_mutations_into_one_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let path = dir.path().join("mapping.json");

        store.record("a", "Extensions/ext-a").await;
        store.record("b", "Extensions/ext-b").await;
        store.record("a", "Extensions/ext-a2").await;

        // Still inside the quiescence window: nothing durable yet.
        assert!(!path.exists());

        wait_past_debounce().await;
        let written: HashMap<String, MappingEntry> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written["a"].location, "Extensions/ext-a2");
        assert_eq!(written["b"].location, "Extensions/ext-b");
    }

    #[tokio::test]
    async fn test_mutation_resets_the_timer() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let path = dir.path().join("mapping.json");

        store.record("a", "Extensions/ext-a").await;
        tokio::time::sleep(TEST_DEBOUNCE / 2).await;
        store.record("b", "Extensions/ext-b").await;
        tokio::time::sleep(TEST_DEBOUNCE * 3 / 4).await;

        // More than one window since the first mutation, but the second
        // re-armed the timer.
        assert!(!path.exists());

        wait_past_debounce().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_remove_unknown_id_schedules_no_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(store.remove("ghost").await.is_none());
        wait_past_debounce().await;
        assert!(!dir.path().join("mapping.json").exists());
    }

    #[tokio::test]
    async fn test_flush_writes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let path = dir.path().join("mapping.json");

        store.record("a", "Extensions/ext-a").await;
        store.flush().await;

        let written: HashMap<String, MappingEntry> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["a"].location, "Extensions/ext-a");

        // Nothing pending afterwards; a second flush is a no-op.
        std::fs::remove_file(&path).unwrap();
        store.flush().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_then_save_persists_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        std::fs::write(
            &path,
            r#"{"a": {"location": "Extensions/ext-a"}, "b": {"location": "Extensions/ext-b"}}"#,
        )
        .unwrap();

        let store = store_in(dir.path());
        assert_eq!(
            store.location_of("a").await.as_deref(),
            Some("Extensions/ext-a")
        );

        store.remove("a").await.unwrap();
        store.flush().await;

        let written: HashMap<String, MappingEntry> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written.contains_key("b"));
    }
}
