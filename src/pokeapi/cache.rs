//! Query keys for PokeAPI calls.

use crate::cache::{Cancelled, QueryKey};

use super::client::PokemonId;
use super::error::ApiError;
use super::types::ListParams;

/// Query key types for PokeAPI calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PokeQueryKey {
  /// One page of the Pokémon list
  List(ListParams),
  /// A single Pokémon, by normalized identifier
  Detail(PokemonId),
}

impl QueryKey for PokeQueryKey {
  fn cache_key(&self) -> String {
    match self {
      Self::List(params) => format!("pokemon_list:page={}:limit={}", params.page, params.limit),
      Self::Detail(id) => format!("pokemon_detail:{}", id),
    }
  }

  fn description(&self) -> String {
    match self {
      Self::List(params) => format!("pokemon page {} ({} per page)", params.page, params.limit),
      Self::Detail(id) => format!("pokemon {}", id),
    }
  }
}

impl From<Cancelled> for ApiError {
  fn from(_: Cancelled) -> Self {
    ApiError::Cancelled
  }
}
