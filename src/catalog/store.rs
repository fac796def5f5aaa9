use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::Notify;
use tracing::{debug, error};

use super::CatalogSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("catalog io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog file does not contain a JSON object")]
    NotAnObject,
}

/// Key-value backing store for the catalog.
///
/// `load` hands back raw values so that startup reconciliation can repair
/// entries written by older or damaged runs.
#[async_trait]
pub trait CatalogPersistence: Send + Sync {
    async fn load(&self) -> Result<Map<String, Value>, StoreError>;
    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), StoreError>;
}

/// Catalog persisted as one JSON object of id -> entry.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CatalogPersistence for JsonFileStore {
    async fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject),
        }
    }

    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("saved {} catalog entries to {}", snapshot.len(), self.path.display());
        Ok(())
    }
}

/// In-process store, used by tests and as a throwaway backend.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Map<String, Value>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(data: Map<String, Value>) -> Self {
        Self {
            data: Mutex::new(data),
            saves: Mutex::new(0),
        }
    }

    pub fn raw(&self) -> Map<String, Value> {
        self.data.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl CatalogPersistence for MemoryStore {
    async fn load(&self) -> Result<Map<String, Value>, StoreError> {
        Ok(self.data.lock().clone())
    }

    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), StoreError> {
        let Value::Object(map) = serde_json::to_value(snapshot)? else {
            return Err(StoreError::NotAnObject);
        };
        *self.data.lock() = map;
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[derive(Default)]
struct SaveState {
    in_flight: bool,
    pending: Option<CatalogSnapshot>,
}

/// Coalesces save requests so writes never overlap.
///
/// While a write is running, newer requests only replace the pending
/// snapshot; the writer picks up the newest one when it finishes.
#[derive(Clone)]
pub struct CatalogStore {
    backend: Arc<dyn CatalogPersistence>,
    state: Arc<Mutex<SaveState>>,
    idle: Arc<Notify>,
}

impl CatalogStore {
    pub fn new(backend: Arc<dyn CatalogPersistence>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(SaveState::default())),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn CatalogPersistence> {
        &self.backend
    }

    pub async fn load(&self) -> Result<Map<String, Value>, StoreError> {
        self.backend.load().await
    }

    /// Schedules `snapshot` to be written. Must be called inside a tokio runtime.
    pub fn request_save(&self, snapshot: CatalogSnapshot) {
        {
            let mut state = self.state.lock();
            state.pending = Some(snapshot);
            if state.in_flight {
                return;
            }
            state.in_flight = true;
        }

        let this = self.clone();
        tokio::spawn(async move { this.drain().await });
    }

    async fn drain(&self) {
        loop {
            let next = {
                let mut state = self.state.lock();
                match state.pending.take() {
                    Some(snapshot) => snapshot,
                    None => {
                        state.in_flight = false;
                        self.idle.notify_waiters();
                        return;
                    }
                }
            };

            if let Err(e) = self.backend.save(&next).await {
                error!("Failed to save catalog: {}", e);
            }
        }
    }

    /// Waits until no write is running or pending.
    pub async fn flush(&self) {
        loop {
            let notified = self.idle.notified();
            if !self.state.lock().in_flight {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::CatalogEntry,
        common::types::{ItemId, MediaFormat},
    };
    use tokio::sync::Semaphore;

    fn snapshot_with(ids: &[&str]) -> CatalogSnapshot {
        ids.iter()
            .map(|id| {
                let id = ItemId::from(*id);
                let entry = CatalogEntry::placeholder(&id);
                (id, entry)
            })
            .collect()
    }

    /// Blocks every write until the test hands out a permit.
    struct GatedStore {
        started: Notify,
        gate: Semaphore,
        saved: Mutex<Vec<CatalogSnapshot>>,
    }

    impl GatedStore {
        fn new() -> Self {
            Self {
                started: Notify::new(),
                gate: Semaphore::new(0),
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogPersistence for GatedStore {
        async fn load(&self) -> Result<Map<String, Value>, StoreError> {
            Ok(Map::new())
        }

        async fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), StoreError> {
            self.started.notify_one();
            let permit = self.gate.acquire().await.map_err(|_| StoreError::NotAnObject)?;
            permit.forget();
            self.saved.lock().push(snapshot.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn saves_during_write_coalesce_into_one() {
        let backend = Arc::new(GatedStore::new());
        let store = CatalogStore::new(backend.clone());

        store.request_save(snapshot_with(&["a"]));
        backend.started.notified().await;

        store.request_save(snapshot_with(&["a", "b"]));
        store.request_save(snapshot_with(&["a", "b", "c"]));
        store.request_save(snapshot_with(&["a", "b", "c", "d"]));

        backend.gate.add_permits(10);
        store.flush().await;

        let saved = backend.saved.lock();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].len(), 1);
        assert_eq!(saved[1], snapshot_with(&["a", "b", "c", "d"]));
    }

    #[tokio::test]
    async fn flush_returns_when_idle() {
        let store = CatalogStore::new(Arc::new(MemoryStore::new()));
        store.flush().await;
    }

    #[tokio::test]
    async fn json_file_round_trip() {
        let dir = std::env::temp_dir().join(format!(
            "lockstep-store-{}",
            crate::common::SessionId::generate()
        ));
        let store = JsonFileStore::new(dir.join("infos.json"));
        assert!(store.load().await.unwrap().is_empty());

        let id = ItemId::from("abc123");
        let mut entry = CatalogEntry::placeholder(&id);
        entry.mark_loaded(MediaFormat::Mp4);
        let mut snapshot = CatalogSnapshot::new();
        snapshot.insert(id, entry);
        store.save(&snapshot).await.unwrap();

        let raw = store.load().await.unwrap();
        assert_eq!(raw["abc123"]["loaded"], true);
        assert_eq!(raw["abc123"]["format"], "mp4");
        assert!(!store.temp_path().exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn non_object_file_is_rejected() {
        let dir = std::env::temp_dir().join(format!(
            "lockstep-store-{}",
            crate::common::SessionId::generate()
        ));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("infos.json");
        tokio::fs::write(&path, b"[1, 2]").await.unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::NotAnObject)));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
