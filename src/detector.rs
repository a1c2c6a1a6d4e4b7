use crate::cache::{CacheStore, LAST_COUNT_KEY};
use crate::error::AppError;
use serde::Serialize;

/// Result of comparing a fresh count against the cached one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Change {
    pub previous: Option<i64>,
    pub changed: bool,
}

/// At-most-once-per-change gate over the cached block count.
///
/// An absent key means "never reported" and always counts as a change;
/// it is never read as zero.
pub struct ChangeDetector<'a> {
    cache: &'a dyn CacheStore,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(cache: &'a dyn CacheStore) -> Self {
        Self { cache }
    }

    /// Last reported count, if any
    pub fn last_reported(&self) -> Result<Option<i64>, AppError> {
        match self.cache.get(LAST_COUNT_KEY)? {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<i64>().map(Some).map_err(|e| {
                AppError::CacheUnavailable(format!(
                    "Cached {LAST_COUNT_KEY} is not an integer ({raw:?}): {e}"
                ))
            }),
        }
    }

    /// Compare `current` with the cache, writing it back when it differs.
    pub fn check(&self, current: i64) -> Result<Change, AppError> {
        let previous = self.last_reported()?;
        let changed = previous != Some(current);
        if changed {
            self.cache.set(LAST_COUNT_KEY, &current.to_string())?;
        }
        Ok(Change { previous, changed })
    }

    pub fn should_notify(&self, current: i64) -> Result<bool, AppError> {
        Ok(self.check(current)?.changed)
    }
}
