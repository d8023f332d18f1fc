//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Canonical identity of a request.
///
/// Two requests with the same `cache_key` share one cache entry.
pub trait QueryKey {
  /// Stable key built from the endpoint name and its parameters
  fn cache_key(&self) -> String;

  /// Human readable description for logs
  fn description(&self) -> String;
}

/// Marker error for loads that were dropped because the cache was cleared.
///
/// Error types stored in a [`QueryCache`](super::QueryCache) must be
/// constructible from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("query was cancelled")
  }
}

/// Observable state of one cache entry.
#[derive(Debug)]
pub enum QueryStatus<T, E> {
  /// Entry exists (someone subscribed) but nothing was requested yet
  Idle,
  /// A load is in flight
  Pending,
  /// Last load succeeded
  Success {
    data: Arc<T>,
    fetched_at: DateTime<Utc>,
  },
  /// Last load failed
  Error(E),
}

impl<T, E: Clone> Clone for QueryStatus<T, E> {
  fn clone(&self) -> Self {
    match self {
      Self::Idle => Self::Idle,
      Self::Pending => Self::Pending,
      Self::Success { data, fetched_at } => Self::Success {
        data: Arc::clone(data),
        fetched_at: *fetched_at,
      },
      Self::Error(e) => Self::Error(e.clone()),
    }
  }
}

impl<T, E> QueryStatus<T, E> {
  pub fn is_pending(&self) -> bool {
    matches!(self, Self::Pending)
  }

  #[cfg(test)]
  pub fn is_success(&self) -> bool {
    matches!(self, Self::Success { .. })
  }

  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    matches!(self, Self::Error(_))
  }

  #[cfg(test)]
  pub fn data(&self) -> Option<&Arc<T>> {
    match self {
      Self::Success { data, .. } => Some(data),
      _ => None,
    }
  }

  #[cfg(test)]
  pub fn error(&self) -> Option<&E> {
    match self {
      Self::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug)]
pub struct CacheResult<T> {
  /// The actual data, shared with every other consumer of the same entry
  pub data: Arc<T>,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was loaded from the network
  pub fetched_at: DateTime<Utc>,
}

impl<T> Clone for CacheResult<T> {
  fn clone(&self) -> Self {
    Self {
      data: Arc::clone(&self.data),
      source: self.source,
      fetched_at: self.fetched_at,
    }
  }
}

impl<T> CacheResult<T> {
  pub fn new(data: Arc<T>, source: CacheSource, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source,
      fetched_at,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// This call started the load
  Network,
  /// This call joined a load another caller had already started
  InFlight,
  /// Served from a live entry without loading
  Cache,
}
