//! Persistent location cache
//!
//! Maps the exact address string sent to the geocoder to the resolved
//! [`Location`]. The whole map is persisted as one JSON document, rewritten
//! on every flush. Entries are never evicted.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, RwLock};
use tokio::task;

use crate::error::EmissionsError;
use crate::models::Location;

/// Default number of insertions between two opportunistic flushes
pub const DEFAULT_FLUSH_EVERY: usize = 100;

/// Decides when pending insertions are worth writing to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushPolicy {
    every: usize,
    pending: usize,
}

impl FlushPolicy {
    /// Flush after every `every` insertions (at least one)
    #[must_use]
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            pending: 0,
        }
    }

    pub fn record_insert(&mut self) {
        self.pending += 1;
    }

    #[must_use]
    pub fn is_due(&self) -> bool {
        self.pending >= self.every
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn reset(&mut self) {
        self.pending = 0;
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_EVERY)
    }
}

#[derive(Debug)]
struct StoreState {
    entries: HashMap<String, Location>,
    policy: FlushPolicy,
}

/// Address → location cache backed by a JSON file
#[derive(Debug)]
pub struct LocationStore {
    path: PathBuf,
    state: RwLock<StoreState>,
    flush_lock: Mutex<()>,
}

impl LocationStore {
    /// Load the cache document at `path`, starting empty if it does not exist.
    ///
    /// A document that exists but does not parse is an error: starting over
    /// would silently drop every past resolution.
    #[tracing::instrument(name = "load_cache", level = "debug", skip(policy))]
    pub fn load(path: impl AsRef<Path> + std::fmt::Debug, policy: FlushPolicy) -> Result<Self, EmissionsError> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                tracing::warn!("Location cache {} is empty, starting fresh", path.display());
                HashMap::new()
            } else {
                serde_json::from_str(&content).map_err(|source| EmissionsError::CacheCorrupt {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            tracing::debug!("No location cache at {}, starting fresh", path.display());
            HashMap::new()
        };

        tracing::info!("Loaded {} cached locations from {}", entries.len(), path.display());

        Ok(Self {
            path,
            state: RwLock::new(StoreState { entries, policy }),
            flush_lock: Mutex::new(()),
        })
    }

    /// Cached location for an exact address string
    pub async fn get(&self, key: &str) -> Option<Location> {
        self.state.read().await.entries.get(key).cloned()
    }

    /// Insert or overwrite an entry. Only memory is touched until a flush.
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, location))]
    pub async fn put(&self, key: &str, location: Location) {
        let mut state = self.state.write().await;
        state.entries.insert(key.to_string(), location);
        state.policy.record_insert();
    }

    /// Write the cache document.
    ///
    /// With `force` the document is always written; otherwise only once the
    /// flush policy is due. Returns whether a write happened.
    #[tracing::instrument(name = "flush_cache", level = "debug", skip(self))]
    pub async fn flush(&self, force: bool) -> Result<bool, EmissionsError> {
        let _guard = self.flush_lock.lock().await;

        let bytes = {
            let mut state = self.state.write().await;
            if !force && !state.policy.is_due() {
                return Ok(false);
            }
            state.policy.reset();
            let sorted: BTreeMap<&String, &Location> = state.entries.iter().collect();
            serde_json::to_vec_pretty(&sorted)?
        };

        let path = self.path.clone();
        task::spawn_blocking(move || write_document(&path, &bytes))
            .await
            .map_err(|e| EmissionsError::cache(format!("Cache flush task failed: {e}")))??;

        tracing::debug!("Location cache written to {}", self.path.display());
        Ok(true)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Insertions not yet written to disk
    pub async fn pending(&self) -> usize {
        self.state.read().await.policy.pending()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write through a sibling temporary file so a crash mid-write leaves the
/// previous document in place.
fn write_document(path: &Path, bytes: &[u8]) -> Result<(), EmissionsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bern() -> Location {
        Location::with_country("Bern, Switzerland", 46.948, 7.4474, "CH")
    }

    #[test]
    fn test_flush_policy_counts_insertions() {
        let mut policy = FlushPolicy::new(3);
        policy.record_insert();
        policy.record_insert();
        assert!(!policy.is_due());
        policy.record_insert();
        assert!(policy.is_due());
        policy.reset();
        assert!(!policy.is_due());
        assert_eq!(policy.pending(), 0);
    }

    #[test]
    fn test_flush_policy_zero_means_every_insert() {
        let mut policy = FlushPolicy::new(0);
        policy.record_insert();
        assert!(policy.is_due());
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = LocationStore::load(dir.path().join("geocache.json"), FlushPolicy::default()).unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.get("Bern").await, None);
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("geocache.json");

        let store = LocationStore::load(&path, FlushPolicy::default()).unwrap();
        store.put("Bern (Suisse)", bern()).await;
        assert!(store.flush(true).await.unwrap());

        let reloaded = LocationStore::load(&path, FlushPolicy::default()).unwrap();
        assert_eq!(reloaded.len().await, 1);
        assert_eq!(reloaded.get("Bern (Suisse)").await, Some(bern()));
    }

    #[tokio::test]
    async fn test_opportunistic_flush_waits_for_policy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocache.json");
        let store = LocationStore::load(&path, FlushPolicy::new(2)).unwrap();

        store.put("a", bern()).await;
        assert!(!store.flush(false).await.unwrap());
        assert!(!path.exists());

        store.put("b", bern()).await;
        assert!(store.flush(false).await.unwrap());
        assert!(path.exists());
        assert_eq!(store.pending().await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocache.json");
        fs::write(&path, "{\"Bern\": {\"address\": ").unwrap();

        let err = LocationStore::load(&path, FlushPolicy::default()).unwrap_err();
        assert!(matches!(err, EmissionsError::CacheCorrupt { .. }));
    }

    #[tokio::test]
    async fn test_blank_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocache.json");
        fs::write(&path, "  \n").unwrap();

        let store = LocationStore::load(&path, FlushPolicy::default()).unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reads_legacy_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocache.json");
        fs::write(
            &path,
            r#"{"Lyon": {"address": "Lyon, France", "latitude": 45.76, "longitude": 4.83, "countryCode": "FR"},
                "Null Island": {"address": "Null Island", "latitude": 0.0, "longitude": 0.0, "countryCode": null}}"#,
        )
        .unwrap();

        let store = LocationStore::load(&path, FlushPolicy::default()).unwrap();
        assert_eq!(store.len().await, 2);
        let lyon = store.get("Lyon").await.unwrap();
        assert_eq!(lyon.country_code.as_deref(), Some("FR"));
        assert_eq!(store.get("Null Island").await.unwrap().country_code, None);
    }
}
