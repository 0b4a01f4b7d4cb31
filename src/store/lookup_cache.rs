use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use crate::model::{Id, UserRecord};
use crate::store::error::BackendError;
use crate::store::traits::{DataService, ListQuery, UserLookup};

pub const DEFAULT_LOOKUP_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolved user info as rendered next to catalog rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Set when the lookup failed; the UI offers a retry instead of a name
    pub error: bool,
}

impl DisplayInfo {
    fn from_user(user: UserRecord) -> Self {
        let name = user
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| user.email.clone())
            .unwrap_or_else(|| user.id.clone());
        Self {
            name,
            email: user.email,
            error: false,
        }
    }

    fn degraded(reason: &str) -> Self {
        Self {
            name: format!("Error: {}", reason),
            email: None,
            error: true,
        }
    }
}

/// Cache entry for a resolved id
#[derive(Clone, Debug)]
struct CacheEntry {
    value: DisplayInfo,
    inserted_at: Instant,
}

type Flight = Arc<OnceCell<DisplayInfo>>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<Id, CacheEntry>,
    in_flight: HashMap<Id, Flight>,
}

/// Time-bounded cache of user display info. Concurrent resolutions of the
/// same id share one lookup; failures resolve to a degraded value and are
/// never cached.
pub struct LookupCache {
    lookup: Arc<dyn UserLookup>,
    state: Arc<Mutex<CacheState>>,
    ttl: Duration,
    timeout: Duration,
}

/// Removes the in-flight marker when the leading resolution ends, however it ends
struct FlightGuard {
    state: Arc<Mutex<CacheState>>,
    id: Id,
    flight: Flight,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state
            .in_flight
            .get(&self.id)
            .is_some_and(|current| Arc::ptr_eq(current, &self.flight))
        {
            state.in_flight.remove(&self.id);
        }
    }
}

impl LookupCache {
    /// Create a cache with the 5-minute TTL and 5-second lookup timeout
    pub fn new(lookup: Arc<dyn UserLookup>) -> Self {
        Self::with_limits(lookup, DEFAULT_LOOKUP_TTL, DEFAULT_LOOKUP_TIMEOUT)
    }

    pub fn with_limits(lookup: Arc<dyn UserLookup>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            lookup,
            state: Arc::new(Mutex::new(CacheState::default())),
            ttl,
            timeout,
        }
    }

    pub async fn resolve(&self, id: &str) -> DisplayInfo {
        let (flight, guard) = {
            let mut state = self.state.lock();

            if let Some(entry) = state.entries.get(id) {
                if entry.inserted_at.elapsed() <= self.ttl {
                    return entry.value.clone();
                }
                state.entries.remove(id);
            }

            match state.in_flight.get(id) {
                Some(flight) => (flight.clone(), None),
                None => {
                    let flight: Flight = Arc::new(OnceCell::new());
                    state.in_flight.insert(id.to_string(), flight.clone());
                    let guard = FlightGuard {
                        state: self.state.clone(),
                        id: id.to_string(),
                        flight: flight.clone(),
                    };
                    (flight, Some(guard))
                }
            }
        };

        let value = flight.get_or_init(|| self.fetch(id)).await.clone();
        drop(guard);
        value
    }

    /// Drop the cached value for `id` and resolve it again
    pub async fn retry(&self, id: &str) -> DisplayInfo {
        self.invalidate(id);
        self.resolve(id).await
    }

    pub fn invalidate(&self, id: &str) {
        self.state.lock().entries.remove(id);
    }

    /// Clear all expired entries from cache
    pub fn clear_expired(&self) {
        let ttl = self.ttl;
        self.state
            .lock()
            .entries
            .retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn fetch(&self, id: &str) -> DisplayInfo {
        debug!("Resolving display info for user {}", id);
        let outcome = tokio::time::timeout(self.timeout, self.lookup.lookup_user(id)).await;

        let reason = match outcome {
            Ok(Ok(user)) => {
                let value = DisplayInfo::from_user(user);
                self.state.lock().entries.insert(
                    id.to_string(),
                    CacheEntry {
                        value: value.clone(),
                        inserted_at: Instant::now(),
                    },
                );
                return value;
            }
            Ok(Err(BackendError::NotFound)) => "user not found".to_string(),
            Ok(Err(err)) => err.to_string(),
            Err(_) => "lookup timed out".to_string(),
        };

        warn!("User lookup for {} failed: {}", id, reason);
        DisplayInfo::degraded(&reason)
    }
}

/// Looks users up in the backend's user table
pub struct UserDirectory {
    data: Arc<dyn DataService>,
    table: String,
}

impl UserDirectory {
    pub const TABLE: &'static str = "usuarios";

    pub fn new(data: Arc<dyn DataService>) -> Self {
        Self {
            data,
            table: Self::TABLE.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl UserLookup for UserDirectory {
    async fn lookup_user(&self, id: &str) -> Result<UserRecord, BackendError> {
        let rows = self
            .data
            .list(&self.table, &ListQuery::new().eq("id", id).limit(1))
            .await?;
        let row = rows.into_iter().next().ok_or(BackendError::NotFound)?;
        serde_json::from_value(row).map_err(|e| BackendError::unknown(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingLookup {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl UserLookup for CountingLookup {
        async fn lookup_user(&self, id: &str) -> Result<UserRecord, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(BackendError::NotFound);
            }
            Ok(UserRecord {
                id: id.to_string(),
                email: Some(format!("{}@example.com", id)),
                name: Some(format!("User {}", id)),
            })
        }
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_lookup() {
        let lookup = CountingLookup::new(Duration::from_millis(50));
        let cache = LookupCache::new(lookup.clone());

        let (first, second) = tokio::join!(cache.resolve("u1"), cache.resolve("u1"));

        assert_eq!(lookup.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(first.name, "User u1");
        assert!(!first.error);
    }

    #[tokio::test]
    async fn test_cached_value_is_reused_until_invalidated() {
        let lookup = CountingLookup::new(Duration::ZERO);
        let cache = LookupCache::new(lookup.clone());

        cache.resolve("u1").await;
        cache.resolve("u1").await;
        assert_eq!(lookup.calls(), 1);

        cache.retry("u1").await;
        assert_eq!(lookup.calls(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted_on_access() {
        let lookup = CountingLookup::new(Duration::ZERO);
        let cache =
            LookupCache::with_limits(lookup.clone(), Duration::from_millis(10), DEFAULT_LOOKUP_TIMEOUT);

        cache.resolve("u1").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.resolve("u1").await;
        assert_eq!(lookup.calls(), 2);

        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.clear_expired();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failure_resolves_degraded_and_is_not_cached() {
        let lookup = CountingLookup::failing();
        let cache = LookupCache::new(lookup.clone());

        let info = cache.resolve("ghost").await;
        assert!(info.error);
        assert_eq!(info.name, "Error: user not found");
        assert!(cache.is_empty());

        cache.resolve("ghost").await;
        assert_eq!(lookup.calls(), 2);
    }

    #[tokio::test]
    async fn test_slow_lookup_times_out_degraded() {
        let lookup = CountingLookup::new(Duration::from_millis(200));
        let cache =
            LookupCache::with_limits(lookup.clone(), DEFAULT_LOOKUP_TTL, Duration::from_millis(20));

        let info = cache.resolve("slow").await;
        assert!(info.error);
        assert_eq!(info.name, "Error: lookup timed out");

        // marker is cleared, so the next call starts a fresh lookup
        cache.resolve("slow").await;
        assert_eq!(lookup.calls(), 2);
    }
}
