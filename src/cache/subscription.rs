//! Explicit mount handle on a cache entry.

use std::sync::Weak;
use tokio::sync::watch;

use super::store::CacheInner;
#[cfg(test)]
use super::traits::Cancelled;
use super::traits::QueryStatus;

/// A mounted consumer of one cache entry.
///
/// While any subscription is alive the entry is never evicted. Dropping the
/// subscription unmounts it and restarts the entry's retention window; it
/// never cancels a load that is already running.
pub struct Subscription<T, E> {
  cache: Weak<CacheInner<T, E>>,
  key: String,
  entry_id: u64,
  receiver: watch::Receiver<QueryStatus<T, E>>,
}

impl<T, E: Clone> Subscription<T, E> {
  pub(super) fn new(
    cache: Weak<CacheInner<T, E>>,
    key: String,
    entry_id: u64,
    receiver: watch::Receiver<QueryStatus<T, E>>,
  ) -> Self {
    Self {
      cache,
      key,
      entry_id,
      receiver,
    }
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  /// Latest state of the entry.
  pub fn status(&self) -> QueryStatus<T, E> {
    self.receiver.borrow().clone()
  }

  /// Latest state of the entry, marking it as seen.
  pub fn take_status(&mut self) -> QueryStatus<T, E> {
    self.receiver.borrow_and_update().clone()
  }

  /// Whether the entry changed since it was last seen.
  pub fn has_changed(&self) -> bool {
    self.receiver.has_changed().unwrap_or(false)
  }

  #[cfg(test)]
  /// Wait for the next state change.
  ///
  /// Fails once the entry has been removed from the cache.
  pub async fn changed(&mut self) -> Result<(), Cancelled> {
    self.receiver.changed().await.map_err(|_| Cancelled)
  }

  #[cfg(test)]
  pub fn unsubscribe(self) {}
}

impl<T, E> Drop for Subscription<T, E> {
  fn drop(&mut self) {
    if let Some(cache) = self.cache.upgrade() {
      cache.release(&self.key, self.entry_id);
    }
  }
}
