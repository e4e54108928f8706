//! Persisted key/value storage for taskboard.
//!
//! Values are JSON documents addressed by short string keys (`authToken`,
//! `currentUser`, `mockTasks`, ...). [`FileStorage`] keeps one file per key in
//! a directory; [`MemoryStorage`] is the volatile variant used by tests and
//! throwaway sessions.

mod error;

pub use error::StoreError;

use lru::LruCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

const READ_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// String-keyed storage of raw JSON documents.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    /// Returns an error if the key is invalid or the backing medium fails.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the key is invalid or the backing medium fails.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns an error if the key is invalid or the backing medium fails.
    fn remove(&self, key: &str) -> Result<()>;

    /// Read and decode a JSON value.
    ///
    /// # Errors
    /// Returns [`StoreError::Decode`] when the stored document does not match `T`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        self.get(key)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
                    key: key.to_owned(),
                    source,
                })
            })
            .transpose()
    }

    /// Encode and store a JSON value.
    ///
    /// # Errors
    /// Returns [`StoreError::Encode`] when `value` cannot be serialized.
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_owned(),
            source,
        })?;
        self.set(key, &raw)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_owned()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Directory of `<key>.json` files with an LRU read cache.
pub struct FileStorage {
    root: PathBuf,
    cache: Mutex<LruCache<String, String>>,
}

impl FileStorage {
    /// Open storage rooted at `root`, creating the directory when needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!(root = %root.display(), "Opened file storage");
        Ok(Self {
            root,
            cache: Mutex::new(LruCache::new(READ_CACHE_CAPACITY)),
        })
    }

    /// Directory holding the value files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        if let Some(value) = lock(&self.cache).get(key).cloned() {
            return Ok(Some(value));
        }
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => {
                lock(&self.cache).put(key.to_owned(), value.clone());
                Ok(Some(value))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        if let Err(err) = fs::rename(&staging, &path) {
            if let Err(cleanup) = fs::remove_file(&staging) {
                warn!(key, error = %cleanup, "Failed to remove staging file");
            }
            return Err(err.into());
        }
        lock(&self.cache).put(key.to_owned(), value.to_owned());
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        lock(&self.cache).pop(key);
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                debug!(key, "Removed value");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Volatile storage kept in a hash map.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        lock(&self.entries).remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_restricted_to_file_safe_characters() {
        for key in ["authToken", "current_user", "mock-tasks", "v1.cache"] {
            assert!(validate_key(key).is_ok(), "{key}");
        }
        for key in ["", "../etc/passwd", "a/b", ".hidden", "white space"] {
            assert!(matches!(validate_key(key), Err(StoreError::InvalidKey(_))), "{key}");
        }
    }

    #[test]
    fn memory_storage_round_trips_json() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());
        storage
            .set_json("numbers", &[1, 2, 3])
            .unwrap_or_else(|err| panic!("set: {err}"));
        let numbers: Option<Vec<u8>> = storage.get_json("numbers").unwrap_or_else(|err| panic!("get: {err}"));
        assert_eq!(numbers, Some(vec![1, 2, 3]));
        assert_eq!(storage.len(), 1);

        storage.remove("numbers").unwrap_or_else(|err| panic!("remove: {err}"));
        storage.remove("numbers").unwrap_or_else(|err| panic!("remove twice: {err}"));
        assert!(storage.is_empty());
    }

    #[test]
    fn decode_errors_name_the_key() {
        let storage = MemoryStorage::new();
        storage.set("broken", "{not json").unwrap_or_else(|err| panic!("set: {err}"));
        let Err(err) = storage.get_json::<Vec<u8>>("broken") else {
            panic!("malformed JSON must fail to decode");
        };
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn shared_handles_see_the_same_entries() {
        let storage = Arc::new(MemoryStorage::new());
        let other = Arc::clone(&storage);
        storage.set("authToken", "\"abc\"").unwrap_or_else(|err| panic!("set: {err}"));
        let token: Option<String> = other.get_json("authToken").unwrap_or_else(|err| panic!("get: {err}"));
        assert_eq!(token.as_deref(), Some("abc"));
    }
}
