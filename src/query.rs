//! View-side handle over a cached query.
//!
//! Inspired by TanStack Query, a `Query<T>` is what a view holds for each
//! piece of remote data it shows. It mounts a [`Subscription`] on the cache
//! entry, starts fetches on a background task, and exposes the
//! `is_loading` / `is_fetching` / `error` flags the view renders from.
//!
//! # Example
//!
//! ```ignore
//! let api = cached_api.clone();
//! let mut query = Query::new(cached_api.subscribe_list(params), move || {
//!     let api = api.clone();
//!     async move { api.list_page(params).await }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```
//!
//! Dropping a `Query` unmounts it: results stop being delivered to the view,
//! but a load that is already running still completes and is cached.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cache::{CacheResult, CacheSource, QueryStatus, Subscription};
use crate::pokeapi::error::ApiError;

type QueryResult<T> = Result<CacheResult<T>, ApiError>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<'static, QueryResult<T>> + Send + Sync>;

pub struct Query<T> {
  subscription: Subscription<T, ApiError>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<QueryResult<T>>>,
  data: Option<Arc<T>>,
  error: Option<ApiError>,
  fetched_at: Option<DateTime<Utc>>,
  source: Option<CacheSource>,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// Create a query mounted on `subscription`.
  ///
  /// The fetcher is called each time `fetch()` or `refetch()` starts a
  /// request; it should go through the cache so concurrent views share one
  /// network call.
  pub fn new<F, Fut>(subscription: Subscription<T, ApiError>, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = QueryResult<T>> + Send + 'static,
  {
    let mut query = Self {
      subscription,
      fetcher: Box::new(move || fetcher().boxed()),
      receiver: None,
      data: None,
      error: None,
      fetched_at: None,
      source: None,
    };
    // Pick up whatever the entry already holds
    query.absorb_status();
    query
  }

  /// Data from the last successful load, kept while a refetch is running.
  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  /// Same as `data()`, as a handle that can outlive this query.
  pub fn shared_data(&self) -> Option<&Arc<T>> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }

  pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
    self.fetched_at
  }

  pub fn source(&self) -> Option<CacheSource> {
    self.source
  }

  /// A request is outstanding, either ours or another consumer's.
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some() || self.subscription.status().is_pending()
  }

  /// Fetching with nothing to show yet.
  pub fn is_loading(&self) -> bool {
    self.is_fetching() && self.data.is_none()
  }

  /// Start fetching data if not already loading.
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    self.start_fetch();
  }

  /// Start a new fetch, abandoning delivery of any pending one.
  ///
  /// Callers that want fresh data rather than the cached entry must
  /// invalidate the key first.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch and for changes made to the
  /// entry by other consumers.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    if let Some(receiver) = &mut self.receiver {
      match receiver.try_recv() {
        Ok(Ok(result)) => {
          self.source = Some(result.source);
          self.fetched_at = Some(result.fetched_at);
          self.data = Some(result.data);
          self.error = None;
          self.receiver = None;
          changed = true;
        }
        Ok(Err(error)) => {
          self.error = Some(error);
          self.receiver = None;
          changed = true;
        }
        Err(mpsc::error::TryRecvError::Empty) => {}
        Err(mpsc::error::TryRecvError::Disconnected) => {
          // Sender dropped without sending - treat as error
          self.error = Some(ApiError::Cancelled);
          self.receiver = None;
          changed = true;
        }
      }
    }

    if self.subscription.has_changed() {
      self.absorb_status();
      changed = true;
    }

    changed
  }

  fn absorb_status(&mut self) {
    match self.subscription.take_status() {
      QueryStatus::Success { data, fetched_at } => {
        self.data = Some(data);
        self.fetched_at = Some(fetched_at);
        self.error = None;
      }
      QueryStatus::Error(error) => self.error = Some(error),
      QueryStatus::Idle | QueryStatus::Pending => {}
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the view may have been closed
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.subscription.key())
      .field("data", &self.data)
      .field("error", &self.error)
      .field("fetched_at", &self.fetched_at)
      .finish_non_exhaustive()
  }
}
