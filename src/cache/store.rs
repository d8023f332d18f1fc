//! In-memory query store with in-flight de-duplication.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::subscription::Subscription;
use super::traits::{CacheResult, CacheSource, Cancelled, QueryKey, QueryStatus};

type Loaded<T> = (Arc<T>, DateTime<Utc>);
type LoadFuture<T, E> = Shared<BoxFuture<'static, Result<Loaded<T>, E>>>;

/// Cache tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
  /// How long an unsubscribed entry survives after its last access
  pub retention: Duration,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      retention: Duration::from_secs(300),
    }
  }
}

/// Number of entries in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
  pub idle: usize,
  pub pending: usize,
  pub success: usize,
  pub error: usize,
}

impl CacheStats {
  pub fn total(&self) -> usize {
    self.idle + self.pending + self.success + self.error
  }
}

impl std::ops::Add for CacheStats {
  type Output = CacheStats;

  fn add(self, rhs: Self) -> Self {
    CacheStats {
      idle: self.idle + rhs.idle,
      pending: self.pending + rhs.pending,
      success: self.success + rhs.success,
      error: self.error + rhs.error,
    }
  }
}

struct InFlight<T, E> {
  future: LoadFuture<T, E>,
  abort: AbortHandle,
}

struct CacheEntry<T, E> {
  id: u64,
  description: String,
  state: watch::Sender<QueryStatus<T, E>>,
  in_flight: Option<InFlight<T, E>>,
  last_accessed: Instant,
  subscribers: usize,
  stale: bool,
  generation: u64,
}

impl<T, E> CacheEntry<T, E> {
  fn new(id: u64, description: String, now: Instant) -> Self {
    let (state, _) = watch::channel(QueryStatus::Idle);
    Self {
      id,
      description,
      state,
      in_flight: None,
      last_accessed: now,
      subscribers: 0,
      stale: false,
      generation: 0,
    }
  }

  /// Mounted subscribers keep an entry alive; otherwise it lives for
  /// `retention` after the last access.
  fn is_retained(&self, now: Instant, retention: Duration) -> bool {
    self.subscribers > 0 || now.saturating_duration_since(self.last_accessed) < retention
  }

  fn live_data(&self, now: Instant, retention: Duration) -> Option<CacheResult<T>> {
    if self.stale || self.in_flight.is_some() || !self.is_retained(now, retention) {
      return None;
    }
    match &*self.state.borrow() {
      QueryStatus::Success { data, fetched_at } => Some(CacheResult::new(
        Arc::clone(data),
        CacheSource::Cache,
        *fetched_at,
      )),
      _ => None,
    }
  }
}

pub(super) struct CacheInner<T, E> {
  entries: Mutex<HashMap<String, CacheEntry<T, E>>>,
  config: CacheConfig,
  counter: AtomicU64,
}

impl<T, E> CacheInner<T, E> {
  fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T, E>>> {
    // The map is only mutated in short synchronous sections; a panic in one
    // of them cannot leave an entry half-written.
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn next_id(&self) -> u64 {
    self.counter.fetch_add(1, Ordering::Relaxed) + 1
  }

  pub(super) fn release(&self, key: &str, entry_id: u64) {
    let mut entries = self.lock();
    if let Some(entry) = entries.get_mut(key).filter(|e| e.id == entry_id) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
      entry.last_accessed = Instant::now();
      debug!(query = %entry.description, subscribers = entry.subscribers, "Unsubscribed");
    }
  }

  fn evict_expired(&self) -> usize {
    let now = Instant::now();
    let retention = self.config.retention;
    let mut entries = self.lock();
    let before = entries.len();

    entries.retain(|_, entry| entry.in_flight.is_some() || entry.is_retained(now, retention));

    let evicted = before - entries.len();
    if evicted > 0 {
      info!(evicted, remaining = entries.len(), "Evicted expired cache entries");
    }
    evicted
  }
}

impl<T, E> CacheInner<T, E>
where
  T: Send + Sync + 'static,
  E: Clone + fmt::Display + Send + Sync + 'static,
{
  fn complete(&self, key: &str, generation: u64, result: &Result<Loaded<T>, E>) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(key) else {
      debug!(key, "Load finished after its entry was removed");
      return;
    };
    if entry.generation != generation {
      return;
    }

    entry.in_flight = None;
    entry.last_accessed = Instant::now();

    let status = match result {
      Ok((data, fetched_at)) => {
        debug!(query = %entry.description, "Load succeeded");
        QueryStatus::Success {
          data: Arc::clone(data),
          fetched_at: *fetched_at,
        }
      }
      Err(e) => {
        warn!(query = %entry.description, error = %e, "Load failed");
        QueryStatus::Error(e.clone())
      }
    };
    entry.state.send_replace(status);
  }
}

/// Shared store of query state.
///
/// Cloning is cheap and every clone sees the same entries. Construct one per
/// session (or per test) and hand it to whoever needs it.
pub struct QueryCache<T, E> {
  inner: Arc<CacheInner<T, E>>,
}

impl<T, E> Clone for QueryCache<T, E> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T, E> QueryCache<T, E>
where
  T: Send + Sync + 'static,
  E: Clone + fmt::Display + From<Cancelled> + Send + Sync + 'static,
{
  pub fn new(config: CacheConfig) -> Self {
    Self {
      inner: Arc::new(CacheInner {
        entries: Mutex::new(HashMap::new()),
        config,
        counter: AtomicU64::new(0),
      }),
    }
  }

  /// Return the current-or-future result for `key`.
  ///
  /// A live successful entry is returned without calling `loader`. A pending
  /// entry is joined. Otherwise `loader` is called exactly once and its
  /// future is driven on its own task, so the load completes and is cached
  /// even if every caller stops waiting.
  pub async fn query<K, F, Fut>(&self, key: &K, loader: F) -> Result<CacheResult<T>, E>
  where
    K: QueryKey + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    let cache_key = key.cache_key();

    let (load, source) = {
      let mut entries = self.inner.lock();
      let now = Instant::now();
      let entry = entries
        .entry(cache_key.clone())
        .or_insert_with(|| CacheEntry::new(self.inner.next_id(), key.description(), now));

      if let Some(hit) = entry.live_data(now, self.inner.config.retention) {
        entry.last_accessed = now;
        debug!(query = %entry.description, "Cache hit");
        return Ok(hit);
      }
      entry.last_accessed = now;

      let joined = entry.in_flight.as_ref().map(|f| f.future.clone());
      match joined {
        Some(future) => {
          debug!(query = %entry.description, "Joining in-flight load");
          (future, CacheSource::InFlight)
        }
        None => (
          self.start_load(&cache_key, entry, loader()),
          CacheSource::Network,
        ),
      }
    };

    let (data, fetched_at) = load.await?;
    Ok(CacheResult::new(data, source, fetched_at))
  }

  /// Must be called with the entry map locked.
  fn start_load<Fut>(
    &self,
    cache_key: &str,
    entry: &mut CacheEntry<T, E>,
    fut: Fut,
  ) -> LoadFuture<T, E>
  where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    let generation = self.inner.next_id();
    entry.generation = generation;
    entry.stale = false;
    entry.state.send_replace(QueryStatus::Pending);
    debug!(query = %entry.description, generation, "Starting load");

    let inner = Arc::downgrade(&self.inner);
    let key = cache_key.to_string();
    let handle = tokio::spawn(async move {
      // A panicking loader still has to settle the entry, or it stays
      // Pending and every later query joins a dead load.
      let result = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result.map(|data| (Arc::new(data), Utc::now())),
        Err(_) => {
          warn!(key = %key, generation, "Loader panicked");
          Err(E::from(Cancelled))
        }
      };
      if let Some(inner) = inner.upgrade() {
        inner.complete(&key, generation, &result);
      }
      result
    });

    let abort = handle.abort_handle();
    let future = async move {
      handle
        .await
        .unwrap_or_else(|_| Err(E::from(Cancelled)))
    }
    .boxed()
    .shared();

    entry.in_flight = Some(InFlight {
      future: future.clone(),
      abort,
    });
    future
  }

  /// Mark `key` stale so the next `query` loads it again.
  ///
  /// Returns false if there is nothing settled to invalidate.
  pub fn invalidate<K: QueryKey + ?Sized>(&self, key: &K) -> bool {
    let mut entries = self.inner.lock();
    match entries.get_mut(&key.cache_key()) {
      Some(entry) if entry.in_flight.is_none() => {
        debug!(query = %entry.description, "Invalidated");
        entry.stale = true;
        true
      }
      _ => false,
    }
  }

  /// Mount a subscriber on `key`, creating an idle entry if needed.
  pub fn subscribe<K: QueryKey + ?Sized>(&self, key: &K) -> Subscription<T, E> {
    let cache_key = key.cache_key();
    let mut entries = self.inner.lock();
    let now = Instant::now();
    let entry = entries
      .entry(cache_key.clone())
      .or_insert_with(|| CacheEntry::new(self.inner.next_id(), key.description(), now));

    entry.subscribers += 1;
    entry.last_accessed = now;
    debug!(query = %entry.description, subscribers = entry.subscribers, "Subscribed");

    Subscription::new(
      Arc::downgrade(&self.inner),
      cache_key,
      entry.id,
      entry.state.subscribe(),
    )
  }

  #[cfg(test)]
  /// Current state of `key` without touching its access time.
  pub fn status<K: QueryKey + ?Sized>(&self, key: &K) -> Option<QueryStatus<T, E>> {
    let entries = self.inner.lock();
    entries
      .get(&key.cache_key())
      .map(|entry| entry.state.borrow().clone())
  }

  #[cfg(test)]
  pub fn subscriber_count<K: QueryKey + ?Sized>(&self, key: &K) -> usize {
    let entries = self.inner.lock();
    entries
      .get(&key.cache_key())
      .map(|entry| entry.subscribers)
      .unwrap_or(0)
  }

  #[cfg(test)]
  /// Drop every settled entry that has outlived its retention window and
  /// has no subscribers.
  pub fn evict_expired(&self) -> usize {
    self.inner.evict_expired()
  }

  /// Periodically evict expired entries until the cache is dropped.
  pub fn spawn_janitor(&self, period: Duration) -> JoinHandle<()> {
    let inner = Arc::downgrade(&self.inner);
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      // The first tick completes immediately
      ticker.tick().await;
      loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
          break;
        };
        inner.evict_expired();
      }
    })
  }

  pub fn stats(&self) -> CacheStats {
    let entries = self.inner.lock();
    entries
      .values()
      .fold(CacheStats::default(), |mut stats, entry| {
        match &*entry.state.borrow() {
          QueryStatus::Idle => stats.idle += 1,
          QueryStatus::Pending => stats.pending += 1,
          QueryStatus::Success { .. } => stats.success += 1,
          QueryStatus::Error(_) => stats.error += 1,
        }
        stats
      })
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.inner.lock().len()
  }

  /// Tear down all entries. Pending loads are aborted and their waiters
  /// receive [`Cancelled`].
  pub fn clear(&self) {
    let mut entries = self.inner.lock();
    for (_, entry) in entries.drain() {
      if let Some(in_flight) = entry.in_flight {
        in_flight.abort.abort();
      }
    }
    info!("Query cache cleared");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicUsize;

  #[derive(Debug, Clone, PartialEq, Eq)]
  enum TestError {
    Failed(String),
    Cancelled,
  }

  impl From<Cancelled> for TestError {
    fn from(_: Cancelled) -> Self {
      TestError::Cancelled
    }
  }

  impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{:?}", self)
    }
  }

  struct Key(&'static str);

  impl QueryKey for Key {
    fn cache_key(&self) -> String {
      format!("test:{}", self.0)
    }

    fn description(&self) -> String {
      self.0.to_string()
    }
  }

  type TestCache = QueryCache<String, TestError>;

  fn cache() -> TestCache {
    QueryCache::new(CacheConfig::default())
  }

  /// Loader that counts its invocations and resolves after `delay`.
  fn counting_loader(
    calls: &Arc<AtomicUsize>,
    delay: Duration,
    value: &'static str,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<String, TestError>> {
    let calls = Arc::clone(calls);
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      async move {
        tokio::time::sleep(delay).await;
        Ok(value.to_string())
      }
      .boxed()
    }
  }

  fn failing_loader(
    calls: &Arc<AtomicUsize>,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<String, TestError>> {
    let calls = Arc::clone(calls);
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(TestError::Failed("boom".to_string())) }.boxed()
    }
  }

  fn panicking_loader(
    calls: &Arc<AtomicUsize>,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<String, TestError>> {
    let calls = Arc::clone(calls);
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      let explode = true;
      async move {
        if explode {
          panic!("loader exploded");
        }
        Ok(String::new())
      }
      .boxed()
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_queries_share_one_load() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("dup");

    let (a, b) = tokio::join!(
      cache.query(&key, counting_loader(&calls, Duration::from_millis(50), "x")),
      cache.query(&key, counting_loader(&calls, Duration::from_millis(50), "y")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&a.data, &b.data));
    assert_eq!(*a.data, "x");
    assert_eq!(a.source, CacheSource::Network);
    assert_eq!(b.source, CacheSource::InFlight);
  }

  #[tokio::test(start_paused = true)]
  async fn test_success_is_reused_without_loading() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("reuse");

    let first = cache
      .query(&key, counting_loader(&calls, Duration::from_millis(5), "v"))
      .await
      .unwrap();
    let second = cache
      .query(&key, counting_loader(&calls, Duration::from_millis(5), "other"))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.source, CacheSource::Cache);
    assert!(Arc::ptr_eq(&first.data, &second.data));
  }

  #[tokio::test(start_paused = true)]
  async fn test_error_is_refetched_on_next_query() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("flaky");

    let err = cache.query(&key, failing_loader(&calls)).await.unwrap_err();
    assert_eq!(err, TestError::Failed("boom".to_string()));
    assert!(cache.status(&key).unwrap().is_error());

    let ok = cache
      .query(&key, counting_loader(&calls, Duration::from_millis(5), "fixed"))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*ok.data, "fixed");
    assert_eq!(ok.source, CacheSource::Network);
  }

  #[tokio::test(start_paused = true)]
  async fn test_error_reaches_every_waiter() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("shared-error");
    let slow_failure = {
      let calls = Arc::clone(&calls);
      move || {
        calls.fetch_add(1, Ordering::SeqCst);
        async {
          tokio::time::sleep(Duration::from_millis(20)).await;
          Err(TestError::Failed("down".to_string()))
        }
        .boxed()
      }
    };

    let (a, b) = tokio::join!(
      cache.query(&key, slow_failure),
      cache.query(&key, failing_loader(&calls)),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.unwrap_err(), TestError::Failed("down".to_string()));
    assert_eq!(b.unwrap_err(), TestError::Failed("down".to_string()));
  }

  #[tokio::test(start_paused = true)]
  async fn test_distinct_keys_load_independently() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));

    let (slow, fast) = tokio::join!(
      cache.query(&Key("slow"), counting_loader(&calls, Duration::from_millis(100), "s")),
      cache.query(&Key("fast"), counting_loader(&calls, Duration::from_millis(10), "f")),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*slow.unwrap().data, "s");
    assert_eq!(*fast.unwrap().data, "f");
    assert_eq!(cache.stats().success, 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_unsubscribed_entry_expires_after_retention() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("ttl");

    cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "v"))
      .await
      .unwrap();

    tokio::time::advance(Duration::from_secs(299)).await;
    let hit = cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "v"))
      .await
      .unwrap();
    assert_eq!(hit.source, CacheSource::Cache);

    // Access above refreshed the window
    tokio::time::advance(Duration::from_secs(299)).await;
    assert_eq!(cache.evict_expired(), 0);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.evict_expired(), 1);
    assert!(cache.status(&key).is_none());

    let reloaded = cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "v"))
      .await
      .unwrap();
    assert_eq!(reloaded.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_expired_entry_reloads_even_before_sweep() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("lazy-ttl");

    cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "v"))
      .await
      .unwrap();
    tokio::time::advance(Duration::from_secs(301)).await;

    let result = cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "v2"))
      .await
      .unwrap();

    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(*result.data, "v2");
  }

  #[tokio::test(start_paused = true)]
  async fn test_subscribers_keep_entry_alive() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("mounted");

    let subscription = cache.subscribe(&key);
    cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "v"))
      .await
      .unwrap();

    tokio::time::advance(Duration::from_secs(3600)).await;
    assert_eq!(cache.evict_expired(), 0);
    let hit = cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "v"))
      .await
      .unwrap();
    assert_eq!(hit.source, CacheSource::Cache);

    subscription.unsubscribe();
    assert_eq!(cache.subscriber_count(&key), 0);

    tokio::time::advance(Duration::from_secs(299)).await;
    assert_eq!(cache.evict_expired(), 0);
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(cache.evict_expired(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_abandoned_waiter_does_not_cancel_load() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("navigate-away");

    let subscription = cache.subscribe(&key);
    let waited = tokio::time::timeout(
      Duration::from_millis(1),
      cache.query(&key, counting_loader(&calls, Duration::from_millis(50), "done")),
    )
    .await;
    assert!(waited.is_err());
    drop(subscription);
    assert!(cache.status(&key).unwrap().is_pending());

    tokio::time::sleep(Duration::from_millis(100)).await;

    let status = cache.status(&key).unwrap();
    assert_eq!(status.data().map(|d| d.as_str()), Some("done"));

    let hit = cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "again"))
      .await
      .unwrap();
    assert_eq!(hit.source, CacheSource::Cache);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_forces_reload() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("refresh");

    cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "old"))
      .await
      .unwrap();
    assert!(cache.invalidate(&key));

    let fresh = cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "new"))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*fresh.data, "new");
    assert!(!cache.invalidate(&Key("unknown")));
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_leaves_pending_load_alone() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("busy");

    let waiter = {
      let cache = cache.clone();
      let loader = counting_loader(&calls, Duration::from_millis(50), "first");
      tokio::spawn(async move { cache.query(&Key("busy"), loader).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(cache.status(&key).unwrap().is_pending());

    assert!(!cache.invalidate(&key));

    let joined = cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "second"))
      .await
      .unwrap();
    assert_eq!(joined.source, CacheSource::InFlight);
    assert_eq!(*waiter.await.unwrap().unwrap().data, "first");

    // Not marked stale, so the settled result is reused
    let hit = cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "third"))
      .await
      .unwrap();
    assert_eq!(hit.source, CacheSource::Cache);
    assert_eq!(*hit.data, "first");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_panicking_loader_settles_entry_as_error() {
    let cache = QueryCache::<String, TestError>::new(CacheConfig {
      retention: Duration::from_secs(10),
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("panics");

    let err = cache.query(&key, panicking_loader(&calls)).await.unwrap_err();
    assert_eq!(err, TestError::Cancelled);
    assert!(cache.status(&key).unwrap().is_error());
    assert_eq!(cache.stats().pending, 0);

    let recovered = cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "fine"))
      .await
      .unwrap();
    assert_eq!(recovered.source, CacheSource::Network);
    assert_eq!(*recovered.data, "fine");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_panicked_entry_is_evicted() {
    let cache = QueryCache::<String, TestError>::new(CacheConfig {
      retention: Duration::from_secs(10),
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let _ = cache.query(&Key("panics"), panicking_loader(&calls)).await;

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(cache.evict_expired(), 1);
    assert_eq!(cache.len(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_subscription_observes_transitions() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("observed");

    let mut subscription = cache.subscribe(&key);
    assert!(matches!(subscription.status(), QueryStatus::Idle));

    let task = {
      let cache = cache.clone();
      let loader = counting_loader(&calls, Duration::from_millis(10), "seen");
      tokio::spawn(async move { cache.query(&Key("observed"), loader).await })
    };

    subscription.changed().await.unwrap();
    assert!(subscription.status().is_pending());

    subscription.changed().await.unwrap();
    let status = subscription.status();
    assert_eq!(status.data().map(|d| d.as_str()), Some("seen"));

    task.await.unwrap().unwrap();

    // A cache hit does not move a settled entry back to pending
    cache
      .query(&key, counting_loader(&calls, Duration::ZERO, "ignored"))
      .await
      .unwrap();
    assert!(!subscription.has_changed());
  }

  #[tokio::test(start_paused = true)]
  async fn test_clear_cancels_pending_waiters() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = Key("teardown");

    let waiter = {
      let cache = cache.clone();
      let loader = counting_loader(&calls, Duration::from_secs(60), "never");
      tokio::spawn(async move { cache.query(&Key("teardown"), loader).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(cache.stats().pending, 1);

    cache.clear();

    assert_eq!(waiter.await.unwrap().unwrap_err(), TestError::Cancelled);
    assert!(cache.status(&key).is_none());
    assert_eq!(cache.len(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_janitor_sweeps_in_background() {
    let cache = QueryCache::<String, TestError>::new(CacheConfig {
      retention: Duration::from_secs(10),
    });
    let calls = Arc::new(AtomicUsize::new(0));

    cache
      .query(&Key("swept"), counting_loader(&calls, Duration::ZERO, "v"))
      .await
      .unwrap();
    let janitor = cache.spawn_janitor(Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(cache.len(), 0);

    janitor.abort();
  }
}
