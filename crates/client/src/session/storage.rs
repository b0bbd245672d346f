//! Client storage shared between tabs.
//!
//! A [`SharedStorage`] is one storage area (like a browser origin's local
//! storage). Each [`TabStorage`] is a handle onto it. Writes through one tab
//! are delivered as [`StorageEvent`]s to every *other* tab, never to the
//! writer itself.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Capacity of the cross-tab event channel. Slower tabs see `Lagged`.
const EVENT_CAPACITY: usize = 64;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The backing file does not hold a JSON object of strings.
    #[error("storage file {path} is corrupt: {source}")]
    Corrupt {
        /// File being accessed.
        path: PathBuf,
        /// Parse error.
        source: serde_json::Error,
    },

    /// A writer panicked while holding the store lock.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A synchronous string key/value store.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Every entry currently stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn snapshot(&self) -> Result<BTreeMap<String, String>, StorageError>;
}

/// Storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn snapshot(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.clone())
    }
}

/// Storage persisted as a JSON object in a file.
///
/// The file is re-read on every access, so separate processes sharing it
/// see each other's writes. Writes go through a temporary file and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(entries).map_err(|source| {
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut entries = self.load()?;
        apply(&mut entries);
        self.save(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn snapshot(&self) -> Result<BTreeMap<String, String>, StorageError> {
        self.load()
    }
}

/// Identity of one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(Uuid);

impl TabId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A change made by some tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change (`None` when removed).
    pub new_value: Option<String>,
    /// Tab that made the change.
    pub origin: TabId,
}

struct Shared {
    store: Box<dyn KeyValueStore>,
    events: broadcast::Sender<StorageEvent>,
    /// Entries as last written or observed by this process.
    known: Mutex<BTreeMap<String, String>>,
    /// Origin of changes made outside this process.
    outside: TabId,
}

impl Shared {
    /// Apply a write from this process and record it as seen, so the
    /// poller never mistakes it for an outside change. Returns the previous
    /// value.
    fn write(&self, key: &str, value: Option<&str>) -> Result<Option<String>, StorageError> {
        let mut known = self.known.lock().map_err(|_| StorageError::Poisoned)?;
        let old_value = self.store.get(key)?;
        match value {
            Some(value) => {
                self.store.set(key, value)?;
                known.insert(key.to_owned(), value.to_owned());
            }
            None => {
                self.store.remove(key)?;
                known.remove(key);
            }
        }
        Ok(old_value)
    }

    /// Broadcast every difference between the store and what this process
    /// last saw.
    fn sync_outside_changes(&self) -> Result<usize, StorageError> {
        // Tabs in this process write under the same lock.
        let mut known = self.known.lock().map_err(|_| StorageError::Poisoned)?;
        let current = self.store.snapshot()?;

        let mut changed = 0;
        let keys: BTreeSet<String> = known.keys().chain(current.keys()).cloned().collect();
        for key in keys {
            let old_value = known.get(&key).cloned();
            let new_value = current.get(&key).cloned();
            if old_value == new_value {
                continue;
            }
            changed += 1;
            let _ = self.events.send(StorageEvent {
                key,
                old_value,
                new_value,
                origin: self.outside,
            });
        }

        *known = current;
        Ok(changed)
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("store", &self.store)
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

/// One storage area shared by any number of tabs.
#[derive(Debug, Clone)]
pub struct SharedStorage {
    shared: Arc<Shared>,
}

impl SharedStorage {
    /// A process-local storage area.
    #[must_use]
    pub fn memory() -> Self {
        Self::with_store(MemoryStore::default())
    }

    /// A storage area persisted to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the parent directory cannot be created.
    pub fn file(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::with_store(FileStore::open(path)?))
    }

    /// A storage area over a custom store.
    #[must_use]
    pub fn with_store(store: impl KeyValueStore + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let known = store.snapshot().unwrap_or_default();
        Self {
            shared: Arc::new(Shared {
                store: Box::new(store),
                events,
                known: Mutex::new(known),
                outside: TabId::new(),
            }),
        }
    }

    /// Pick up writes made to the store by other processes and deliver them
    /// to every tab. Returns the number of changed keys.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub fn sync_outside_changes(&self) -> Result<usize, StorageError> {
        self.shared.sync_outside_changes()
    }

    /// Call [`Self::sync_outside_changes`] every `interval` in the
    /// background until every handle onto this storage area is dropped.
    #[must_use]
    pub fn watch_outside_changes(&self, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(area) = weak.upgrade() else {
                    return;
                };
                if let Err(e) = area.sync_outside_changes() {
                    tracing::warn!(error = %e, "Failed to poll session storage");
                }
            }
        })
    }

    /// Open a new tab onto this storage area.
    #[must_use]
    pub fn open_tab(&self) -> TabStorage {
        TabStorage {
            id: TabId::new(),
            shared: Arc::clone(&self.shared),
        }
    }
}

/// A tab's handle onto a [`SharedStorage`].
///
/// Clones share the tab identity.
#[derive(Debug, Clone)]
pub struct TabStorage {
    id: TabId,
    shared: Arc<Shared>,
}

impl TabStorage {
    /// This tab's identity.
    #[must_use]
    pub const fn id(&self) -> TabId {
        self.id
    }

    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.shared.store.get(key)
    }

    /// Write a value and notify the other tabs.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be accessed.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = self.shared.write(key, Some(value))?;
        if old_value.as_deref() != Some(value) {
            self.notify(key, old_value, Some(value.to_owned()));
        }
        Ok(())
    }

    /// Delete a value and notify the other tabs.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be accessed.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let old_value = self.shared.write(key, None)?;
        if old_value.is_some() {
            self.notify(key, old_value, None);
        }
        Ok(())
    }

    /// Receive changes made by other tabs from now on.
    #[must_use]
    pub fn events(&self) -> TabEvents {
        TabEvents {
            tab: self.id,
            rx: self.shared.events.subscribe(),
        }
    }

    fn notify(&self, key: &str, old_value: Option<String>, new_value: Option<String>) {
        // No receivers is fine; nobody is listening yet.
        let _ = self.shared.events.send(StorageEvent {
            key: key.to_owned(),
            old_value,
            new_value,
            origin: self.id,
        });
    }
}

/// Why [`TabEvents::recv`] returned without an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TabEventsError {
    /// Events were dropped because this tab fell behind; re-read storage.
    #[error("missed {0} storage events")]
    Lagged(u64),

    /// Every handle onto the storage area is gone.
    #[error("storage area closed")]
    Closed,
}

/// Stream of storage events from other tabs.
#[derive(Debug)]
pub struct TabEvents {
    tab: TabId,
    rx: broadcast::Receiver<StorageEvent>,
}

impl TabEvents {
    /// Wait for the next change made by another tab.
    ///
    /// # Errors
    ///
    /// Returns `TabEventsError::Lagged` if events were missed and
    /// `TabEventsError::Closed` if the storage area is gone.
    pub async fn recv(&mut self) -> Result<StorageEvent, TabEventsError> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.origin == self.tab => {}
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(TabEventsError::Lagged(n));
                }
                Err(broadcast::error::RecvError::Closed) => return Err(TabEventsError::Closed),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_other_tabs_see_writes() {
        let storage = SharedStorage::memory();
        let writer = storage.open_tab();
        let reader = storage.open_tab();
        let mut events = reader.events();

        writer.set("companyId", "1").unwrap();

        assert_eq!(reader.get("companyId").unwrap().as_deref(), Some("1"));
        let event = events.recv().await.unwrap();
        assert_eq!(event.key, "companyId");
        assert_eq!(event.old_value, None);
        assert_eq!(event.new_value.as_deref(), Some("1"));
        assert_eq!(event.origin, writer.id());
    }

    #[tokio::test]
    async fn test_writer_does_not_see_own_events() {
        let storage = SharedStorage::memory();
        let tab = storage.open_tab();
        let mut events = tab.events();

        tab.set("companyId", "1").unwrap();

        let next = tokio::time::timeout(Duration::from_millis(50), events.recv()).await;
        assert!(next.is_err(), "writer must not receive its own event");
    }

    #[tokio::test]
    async fn test_unchanged_value_is_silent() {
        let storage = SharedStorage::memory();
        let writer = storage.open_tab();
        let mut events = storage.open_tab().events();

        writer.set("k", "v").unwrap();
        writer.set("k", "v").unwrap();
        writer.remove("missing").unwrap();
        writer.remove("k").unwrap();

        assert_eq!(events.recv().await.unwrap().new_value.as_deref(), Some("v"));
        let removal = events.recv().await.unwrap();
        assert_eq!(removal.old_value.as_deref(), Some("v"));
        assert_eq!(removal.new_value, None);
    }

    #[tokio::test]
    async fn test_lagging_tab_is_told_to_resync() {
        let storage = SharedStorage::memory();
        let writer = storage.open_tab();
        let mut events = storage.open_tab().events();

        for i in 0..(EVENT_CAPACITY + 5) {
            writer.set("k", &i.to_string()).unwrap();
        }

        assert!(matches!(
            events.recv().await,
            Err(TabEventsError::Lagged(_))
        ));
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let first = SharedStorage::file(&path).unwrap().open_tab();
        first.set("companyId", "42").unwrap();
        first.set("userId", "7").unwrap();
        first.remove("userId").unwrap();

        let reopened = SharedStorage::file(&path).unwrap().open_tab();
        assert_eq!(reopened.get("companyId").unwrap().as_deref(), Some("42"));
        assert_eq!(reopened.get("userId").unwrap(), None);
    }

    #[tokio::test]
    async fn test_outside_writes_become_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let here = SharedStorage::file(&path).unwrap();
        let tab = here.open_tab();
        let mut events = tab.events();
        tab.set("userId", "1").unwrap();

        // A second process writing the same file.
        let elsewhere = SharedStorage::file(&path).unwrap().open_tab();
        elsewhere.set("companyId", "9").unwrap();

        assert_eq!(here.sync_outside_changes().unwrap(), 1);
        let event = events.recv().await.unwrap();
        assert_eq!(event.key, "companyId");
        assert_eq!(event.new_value.as_deref(), Some("9"));
        assert_ne!(event.origin, tab.id());

        // Nothing new on the next poll.
        assert_eq!(here.sync_outside_changes().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_outside_update_is_one_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let here = SharedStorage::file(&path).unwrap();
        let tab = here.open_tab();
        tab.set("companyId", "1").unwrap();
        let mut events = tab.events();

        let elsewhere = SharedStorage::file(&path).unwrap().open_tab();
        elsewhere.set("companyId", "2").unwrap();

        assert_eq!(here.sync_outside_changes().unwrap(), 1);
        let event = events.recv().await.unwrap();
        assert_eq!(event.old_value.as_deref(), Some("1"));
        assert_eq!(event.new_value.as_deref(), Some("2"));

        let next = tokio::time::timeout(Duration::from_millis(50), events.recv()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn test_polling_never_echoes_own_writes() {
        let storage = SharedStorage::memory();
        let writer = storage.open_tab();
        let mut events = writer.events();

        let poller = {
            let storage = storage.clone();
            std::thread::spawn(move || {
                let mut seen = 0;
                for _ in 0..500 {
                    seen += storage.sync_outside_changes().unwrap();
                }
                seen
            })
        };
        for i in 0..500 {
            writer.set("companyId", &i.to_string()).unwrap();
        }

        assert_eq!(poller.join().unwrap(), 0);
        let next = tokio::time::timeout(Duration::from_millis(50), events.recv()).await;
        assert!(next.is_err());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.get("companyId").unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(matches!(
            store.get("companyId"),
            Err(StorageError::Corrupt { .. })
        ));
    }
}
