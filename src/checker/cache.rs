// src/checker/cache.rs
// =============================================================================
// External URL verdicts: persisted across runs, coalesced within a run.
//
// Two maps behind two mutexes:
// - entries: verdicts loaded from the cache file plus the ones found this
//   run; written back at the end
// - inflight: one OnceCell per URL; the first caller runs the check, every
//   concurrent caller for the same URL awaits that same cell
//
// File format: pretty JSON object, keys sorted, one entry per normalized URL
//   { "https://example.com/": { "verdict": {...}, "checked_at": "...", "status": 200 } }
//
// NOTES:
// - Expired entries are dropped while loading; a timestamp in the future
//   counts as fresh
// - Transient failures that ran out of retries are not stored, and neither
//   are checks cut off by the deadline (their future never completes)
// - Poisoned mutexes are recovered; the maps stay consistent because every
//   critical section is a single insert or lookup
// =============================================================================

use super::http::UrlCheck;
use crate::error::Error;
use crate::model::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::OnceCell;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub verdict: Verdict,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Default)]
pub struct VerdictCache {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
    inflight: Mutex<HashMap<String, Arc<OnceCell<UrlCheck>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl VerdictCache {
    /// A cache that lives for this run only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache file, dropping entries older than `ttl`.
    ///
    /// A missing file is an empty cache. A file that exists but cannot be
    /// read or parsed is an error: silently starting over would hide it.
    pub fn load(path: &Path, ttl: Duration) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache at {}, starting empty", path.display());
                return Ok(Self {
                    path: Some(path.to_path_buf()),
                    ..Self::default()
                });
            }
            Err(source) => {
                return Err(Error::CacheRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let stored: BTreeMap<String, CacheEntry> =
            serde_json::from_str(&content).map_err(|source| Error::CacheCorrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let now = Utc::now();
        let total = stored.len();
        let fresh: BTreeMap<String, CacheEntry> = stored
            .into_iter()
            .filter(|(_, entry)| is_fresh(entry, now, ttl))
            .collect();
        info!(
            "Loaded {} cached verdicts from {} ({} expired)",
            fresh.len(),
            path.display(),
            total - fresh.len()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries: Mutex::new(fresh),
            inflight: Mutex::default(),
        })
    }

    pub fn lookup(&self, key: &str) -> Option<Verdict> {
        lock(&self.entries).get(key).map(|entry| entry.verdict.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// The cached verdict for `key`, or the result of `check`.
    ///
    /// Concurrent callers with the same key share one run of `check`.
    pub async fn get_or_check<F, Fut>(&self, key: &str, check: F) -> Verdict
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UrlCheck>,
    {
        if let Some(verdict) = self.lookup(key) {
            debug!("Cache hit for {}", key);
            return verdict;
        }

        let cell = Arc::clone(lock(&self.inflight).entry(key.to_string()).or_default());
        let result = cell
            .get_or_init(|| async {
                let result = check().await;
                if result.cacheable {
                    self.store(key, &result);
                }
                result
            })
            .await;
        result.verdict.clone()
    }

    fn store(&self, key: &str, check: &UrlCheck) {
        lock(&self.entries).insert(
            key.to_string(),
            CacheEntry {
                verdict: check.verdict.clone(),
                checked_at: Utc::now(),
                status: check.status,
            },
        );
    }

    /// Write the cache back atomically (temp file in the same directory,
    /// then rename). No-op for an in-memory cache.
    pub fn save(&self) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let write_error = |reason: String| Error::CacheWrite {
            path: path.clone(),
            reason,
        };

        let json = {
            let entries = lock(&self.entries);
            serde_json::to_string_pretty(&*entries).map_err(|e| write_error(e.to_string()))?
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(|e| write_error(e.to_string()))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|e| write_error(e.to_string()))?;
        file.persist(path).map_err(|e| write_error(e.error.to_string()))?;

        debug!("Saved {} cached verdicts to {}", self.len(), path.display());
        Ok(())
    }
}

fn is_fresh(entry: &CacheEntry, now: DateTime<Utc>, ttl: Duration) -> bool {
    match now.signed_duration_since(entry.checked_at).to_std() {
        Ok(age) => age <= ttl,
        // checked_at is in the future (clock skew)
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UrlFailure;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOUR: Duration = Duration::from_secs(3600);

    fn entry(verdict: Verdict, age: chrono::Duration) -> CacheEntry {
        CacheEntry {
            verdict,
            checked_at: Utc::now() - age,
            status: Some(200),
        }
    }

    fn valid() -> UrlCheck {
        UrlCheck {
            verdict: Verdict::Valid,
            status: Some(200),
            cacheable: true,
        }
    }

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VerdictCache::load(&dir.path().join("cache.json"), HOUR).unwrap();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = VerdictCache::load(&path, HOUR).unwrap_err();
        assert!(matches!(err, Error::CacheCorrupt { .. }));
    }

    #[test]
    fn test_expired_entries_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut stored = BTreeMap::new();
        stored.insert("https://old.example.com/".to_string(), entry(Verdict::Valid, chrono::Duration::hours(2)));
        stored.insert("https://new.example.com/".to_string(), entry(Verdict::Valid, chrono::Duration::minutes(5)));
        stored.insert("https://skewed.example.com/".to_string(), entry(Verdict::Valid, chrono::Duration::minutes(-5)));
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let cache = VerdictCache::load(&path, HOUR).unwrap();
        assert_eq!(cache.lookup("https://old.example.com/"), None);
        assert_eq!(cache.lookup("https://new.example.com/"), Some(Verdict::Valid));
        assert_eq!(cache.lookup("https://skewed.example.com/"), Some(Verdict::Valid));
    }

    #[tokio::test]
    async fn test_cached_verdict_skips_the_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let gone = Verdict::UnreachableUrl { reason: UrlFailure::HttpStatus { status: 404 } };
        let mut stored = BTreeMap::new();
        stored.insert("https://example.com/gone".to_string(), entry(gone.clone(), chrono::Duration::zero()));
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let cache = VerdictCache::load(&path, HOUR).unwrap();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let verdict = cache
            .get_or_check("https://example.com/gone", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                valid()
            })
            .await;
        assert_eq!(verdict, gone);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_check() {
        let cache = VerdictCache::in_memory();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let check = || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            valid()
        };

        let verdicts = futures::future::join_all(
            (0..5).map(|_| cache.get_or_check("https://example.com/", check)),
        )
        .await;

        assert!(verdicts.iter().all(|v| *v == Verdict::Valid));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_not_stored() {
        let cache = VerdictCache::in_memory();
        let timeout = UrlCheck {
            verdict: Verdict::UnreachableUrl { reason: UrlFailure::Timeout },
            status: None,
            cacheable: false,
        };
        cache.get_or_check("https://slow.example.com/", || async { timeout }).await;
        cache.get_or_check("https://fast.example.com/", || async { valid() }).await;
        assert_eq!(cache.lookup("https://slow.example.com/"), None);
        assert_eq!(cache.lookup("https://fast.example.com/"), Some(Verdict::Valid));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = VerdictCache::load(&path, HOUR).unwrap();
        cache.get_or_check("https://example.com/", || async { valid() }).await;
        cache.save().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"checked_at\""));
        let reloaded = VerdictCache::load(&path, HOUR).unwrap();
        assert_eq!(reloaded.lookup("https://example.com/"), Some(Verdict::Valid));
    }
}
