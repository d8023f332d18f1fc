//! Canned PokeAPI payloads shared by tests.

use serde_json::{json, Value};
use wiremock::MockServer;

use crate::cache::CacheConfig;
use crate::config::ApiConfig;

use super::cached_client::CachedPokeApi;
use super::client::PokeApiClient;

/// Cached client pointed at a mock server's `/api/v2/`.
pub fn cached_api(server: &MockServer) -> CachedPokeApi {
  let client = PokeApiClient::new(&ApiConfig {
    base_url: format!("{}/api/v2/", server.uri()),
    timeout_secs: 5,
  })
  .unwrap();
  CachedPokeApi::new(client, CacheConfig::default())
}

pub fn bulbasaur() -> Value {
  json!({
    "id": 1,
    "name": "bulbasaur",
    "base_experience": 64,
    "height": 7,
    "weight": 69,
    "sprites": {
      "front_default": "https://example.com/1.png",
      "front_shiny": null,
      "front_female": null,
      "front_shiny_female": null,
      "back_default": null,
      "back_shiny": null,
      "back_female": null,
      "back_shiny_female": null,
      "other": {
        "official-artwork": { "front_default": "https://example.com/art/1.png" }
      }
    },
    "types": [
      { "slot": 1, "type": { "name": "grass", "url": "https://pokeapi.co/api/v2/type/12/" } },
      { "slot": 2, "type": { "name": "poison", "url": "https://pokeapi.co/api/v2/type/4/" } }
    ],
    "abilities": [
      { "is_hidden": false, "slot": 1, "ability": { "name": "overgrow", "url": "" } },
      { "is_hidden": true, "slot": 3, "ability": { "name": "chlorophyll", "url": "" } }
    ],
    "stats": [
      { "base_stat": 45, "effort": 0, "stat": { "name": "hp", "url": "" } },
      { "base_stat": 49, "effort": 1, "stat": { "name": "attack", "url": "" } }
    ]
  })
}

/// List payload shaped like the live API: `count` total, one row per name.
pub fn list_page(count: u64, names: &[&str], first_id: u64) -> Value {
  let results: Vec<Value> = names
    .iter()
    .enumerate()
    .map(|(i, name)| {
      json!({
        "name": name,
        "url": format!("https://pokeapi.co/api/v2/pokemon/{}/", first_id + i as u64),
      })
    })
    .collect();

  json!({
    "count": count,
    "next": null,
    "previous": null,
    "results": results,
  })
}
