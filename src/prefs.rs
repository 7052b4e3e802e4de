//! Per-user state that survives restarts: the watchlist and per-movie ratings.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const WATCHED_KEY: &str = "watchedMovies";
pub const RATINGS_KEY: &str = "ratings";

/// Durable string-valued key/value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read stored '{}'", key)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("Failed to write stored '{}'", key))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace stored '{}'", key))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchlistOutcome {
    Added,
    AlreadyPresent,
}

impl WatchlistOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchlistOutcome::Added => "added",
            WatchlistOutcome::AlreadyPresent => "already_present",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            WatchlistOutcome::Added => "Added to your watchlist!",
            WatchlistOutcome::AlreadyPresent => "Already in your watchlist!",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub favorite_genres: Vec<String>,
    pub watched_movies: Vec<i64>,
    pub ratings: HashMap<i64, f32>,
}

impl UserPreferences {
    /// Never fails: absent or corrupt entries fall back to empty defaults.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut watched: Vec<i64> = read_or_default(store, WATCHED_KEY);
        let mut seen = std::collections::HashSet::new();
        watched.retain(|id| seen.insert(*id));
        Self {
            favorite_genres: Vec::new(),
            watched_movies: watched,
            ratings: read_or_default(store, RATINGS_KEY),
        }
    }

    pub fn has_watched(&self, id: i64) -> bool {
        self.watched_movies.contains(&id)
    }

    /// Appends `id` and persists the list; a repeat id writes nothing.
    ///
    /// The store write runs on the blocking pool, and the in-memory list only
    /// changes once it succeeded.
    pub async fn add_to_watchlist(
        &mut self,
        store: Arc<dyn KeyValueStore>,
        id: i64,
    ) -> Result<WatchlistOutcome> {
        if self.has_watched(id) {
            return Ok(WatchlistOutcome::AlreadyPresent);
        }
        let mut watched = self.watched_movies.clone();
        watched.push(id);
        let encoded = serde_json::to_string(&watched).context("Failed to encode watchlist")?;
        tokio::task::spawn_blocking(move || store.set(WATCHED_KEY, &encoded))
            .await
            .context("Watchlist write task failed")??;
        self.watched_movies = watched;
        debug!(movie_id = id, "Watchlist updated");
        Ok(WatchlistOutcome::Added)
    }
}

fn read_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!("Could not read stored '{}', using default: {:#}", key, e);
            return T::default();
        }
    };
    match serde_json::from_str::<Option<T>>(&raw) {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => {
            warn!("Stored '{}' is corrupt, using default: {}", key, e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_yields_empty_preferences() {
        let store = MemoryStore::default();
        let prefs = UserPreferences::load(&store);
        assert!(prefs.watched_movies.is_empty());
        assert!(prefs.ratings.is_empty());
        assert!(prefs.favorite_genres.is_empty());
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        let store = MemoryStore::default();
        store.set(WATCHED_KEY, "not json [").unwrap();
        store.set(RATINGS_KEY, "{\"x\": true}").unwrap();
        let prefs = UserPreferences::load(&store);
        assert!(prefs.watched_movies.is_empty());
        assert!(prefs.ratings.is_empty());
    }

    #[test]
    fn json_null_is_treated_as_empty() {
        let store = MemoryStore::default();
        store.set(WATCHED_KEY, "null").unwrap();
        assert!(UserPreferences::load(&store).watched_movies.is_empty());
    }

    #[tokio::test]
    async fn watchlist_round_trips_through_store() {
        let store = Arc::new(MemoryStore::default());
        let mut prefs = UserPreferences::load(store.as_ref());
        assert_eq!(
            prefs.add_to_watchlist(store.clone(), 42).await.unwrap(),
            WatchlistOutcome::Added
        );
        assert_eq!(
            prefs.add_to_watchlist(store.clone(), 42).await.unwrap(),
            WatchlistOutcome::AlreadyPresent
        );
        assert_eq!(prefs.watched_movies, vec![42]);

        let reloaded = UserPreferences::load(store.as_ref());
        assert!(reloaded.has_watched(42));
        assert_eq!(reloaded.watched_movies.len(), 1);
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("cannot write '{}'", key)
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_watchlist_unchanged() {
        let store: Arc<dyn KeyValueStore> = Arc::new(ReadOnlyStore);
        let mut prefs = UserPreferences::load(store.as_ref());
        assert!(prefs.add_to_watchlist(store, 5).await.is_err());
        assert!(prefs.watched_movies.is_empty());
    }

    #[test]
    fn duplicate_ids_in_storage_collapse() {
        let store = MemoryStore::default();
        store.set(WATCHED_KEY, "[3, 1, 3, 2, 1]").unwrap();
        assert_eq!(UserPreferences::load(&store).watched_movies, vec![3, 1, 2]);
    }

    #[test]
    fn stored_ratings_are_loaded() {
        let store = MemoryStore::default();
        store.set(RATINGS_KEY, "{\"7\": 4.5}").unwrap();
        assert_eq!(UserPreferences::load(&store).ratings.get(&7), Some(&4.5));
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = std::env::temp_dir().join(format!("cinescope-prefs-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        {
            let store = Arc::new(FileStore::open(&dir).unwrap());
            assert_eq!(store.get(WATCHED_KEY).unwrap(), None);
            let mut prefs = UserPreferences::load(store.as_ref());
            prefs.add_to_watchlist(store.clone(), 11).await.unwrap();
        }
        let store = FileStore::open(&dir).unwrap();
        assert_eq!(UserPreferences::load(&store).watched_movies, vec![11]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
