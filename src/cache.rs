use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Key holding the block count last reported
pub const LAST_COUNT_KEY: &str = "num_of_block_last_epoch";

/// Minimal key-value store persisted outside the process
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// On-disk layout of the cache file
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    entries: HashMap<String, String>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// JSON file backed store. A missing file is an empty store.
pub struct FileCacheStore {
    path: PathBuf,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<user cache dir>/pool-block-notifier/cache.json`
    pub fn default_path() -> Result<PathBuf, AppError> {
        let dir = dirs::cache_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| AppError::Config("No cache or home dir".into()))?;
        Ok(dir.join("pool-block-notifier").join("cache.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<CacheFile, AppError> {
        if !self.path.exists() {
            return Ok(CacheFile::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            AppError::CacheUnavailable(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::CacheUnavailable(format!("Corrupt cache file {}: {e}", self.path.display()))
        })
    }

    fn store(&self, file: &CacheFile) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::CacheUnavailable(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(file)?;

        // write-then-rename so a crash never leaves a half written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                AppError::CacheUnavailable(format!("Failed to write {}: {e}", self.path.display()))
            })
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.load()?.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut file = self.load()?;
        file.entries.insert(key.to_string(), value.to_string());
        file.updated_at = Some(chrono::Utc::now().to_rfc3339());
        self.store(&file)
    }
}

/// Redis backed store: plain `GET`/`SET` of decimal strings.
///
/// Connects per call; a run touches the cache at most twice.
pub struct RedisCacheStore {
    client: redis::Client,
    timeout: Duration,
}

impl RedisCacheStore {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::Config(format!("Invalid cache URL: {e}")))?;
        Ok(Self { client, timeout })
    }

    fn connection(&self) -> Result<redis::Connection, AppError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.timeout)
            .map_err(|e| AppError::CacheUnavailable(format!("Failed to connect to redis: {e}")))?;
        conn.set_read_timeout(Some(self.timeout))
            .and_then(|_| conn.set_write_timeout(Some(self.timeout)))
            .map_err(|e| AppError::CacheUnavailable(format!("Failed to configure redis: {e}")))?;
        Ok(conn)
    }
}

impl CacheStore for RedisCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.connection()?;
        redis::cmd("GET")
            .arg(key)
            .query::<Option<String>>(&mut conn)
            .map_err(|e| AppError::CacheUnavailable(format!("GET {key} failed: {e}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut conn = self.connection()?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query::<()>(&mut conn)
            .map_err(|e| AppError::CacheUnavailable(format!("SET {key} failed: {e}")))
    }
}

/// Process-local store
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| AppError::CacheUnavailable(format!("Lock poisoned: {e}")))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| AppError::CacheUnavailable(format!("Lock poisoned: {e}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads through to `inner`, keeps writes in memory. Used for dry runs.
pub struct ReadOnlyCache<S> {
    inner: S,
    writes: MemoryCacheStore,
}

impl<S: CacheStore> ReadOnlyCache<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: MemoryCacheStore::new(),
        }
    }
}

impl<S: CacheStore> CacheStore for ReadOnlyCache<S> {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        match self.writes.get(key)? {
            Some(value) => Ok(Some(value)),
            None => self.inner.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.writes.set(key, value)
    }
}

impl CacheStore for Box<dyn CacheStore> {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        (**self).set(key, value)
    }
}
