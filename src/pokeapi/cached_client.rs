//! Cached PokeAPI client that wraps PokeApiClient with transparent caching.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{CacheConfig, CacheResult, CacheStats, QueryCache, Subscription};

use super::cache::PokeQueryKey;
use super::client::{PokeApiClient, PokemonId};
use super::error::ApiError;
use super::normalize::{normalize_detail, normalize_list};
use super::types::{EntityDetail, ListPage, ListParams};

pub type ListSubscription = Subscription<ListPage, ApiError>;
pub type DetailSubscription = Subscription<EntityDetail, ApiError>;

/// PokeAPI client with one query cache per entity kind.
///
/// This wraps the underlying PokeApiClient and shapes its raw responses;
/// every call goes through the cache, so identical concurrent requests share
/// one network call.
#[derive(Clone)]
pub struct CachedPokeApi {
  inner: PokeApiClient,
  lists: QueryCache<ListPage, ApiError>,
  details: QueryCache<EntityDetail, ApiError>,
}

impl CachedPokeApi {
  pub fn new(inner: PokeApiClient, config: CacheConfig) -> Self {
    Self {
      inner,
      lists: QueryCache::new(config),
      details: QueryCache::new(config),
    }
  }

  pub fn client(&self) -> &PokeApiClient {
    &self.inner
  }

  /// Get one page of the Pokémon list with caching.
  pub async fn list_page(&self, params: ListParams) -> Result<CacheResult<ListPage>, ApiError> {
    let key = PokeQueryKey::List(params);
    self
      .lists
      .query(&key, || {
        let inner = self.inner.clone();
        async move {
          let raw = inner.fetch_list(params).await?;
          normalize_list(&raw, params)
        }
      })
      .await
  }

  /// Get a single Pokémon with caching.
  pub async fn detail(&self, id: &PokemonId) -> Result<CacheResult<EntityDetail>, ApiError> {
    let key = PokeQueryKey::Detail(id.clone());
    self
      .details
      .query(&key, || {
        let inner = self.inner.clone();
        let id = id.clone();
        async move {
          let raw = inner.fetch_detail(&id).await?;
          normalize_detail(&raw)
        }
      })
      .await
  }

  pub fn subscribe_list(&self, params: ListParams) -> ListSubscription {
    self.lists.subscribe(&PokeQueryKey::List(params))
  }

  pub fn subscribe_detail(&self, id: &PokemonId) -> DetailSubscription {
    self.details.subscribe(&PokeQueryKey::Detail(id.clone()))
  }

  pub fn invalidate_list(&self, params: ListParams) -> bool {
    self.lists.invalidate(&PokeQueryKey::List(params))
  }

  pub fn invalidate_detail(&self, id: &PokemonId) -> bool {
    self.details.invalidate(&PokeQueryKey::Detail(id.clone()))
  }

  /// Combined entry counts of both caches.
  pub fn stats(&self) -> CacheStats {
    self.lists.stats() + self.details.stats()
  }

  /// Start background eviction for both caches.
  pub fn spawn_janitors(&self, period: Duration) -> Vec<JoinHandle<()>> {
    debug!(?period, "Starting cache janitors");
    vec![
      self.lists.spawn_janitor(period),
      self.details.spawn_janitor(period),
    ]
  }

  /// Drop every cached query.
  pub fn clear(&self) {
    self.lists.clear();
    self.details.clear();
  }
}
