use crate::config::ApiConfig;
use crate::pokeapi::error::{ApiError, Operation};
use crate::pokeapi::normalize::validate_params;
use crate::pokeapi::types::ListParams;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Identifier of a single Pokémon on the detail endpoint.
///
/// Built from either a full resource URL (`https://pokeapi.co/api/v2/pokemon/1/`)
/// or a bare id/name (`1`, `"pikachu"`). Both forms of the same Pokémon
/// compare equal and map to the same remote path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PokemonId(String);

impl PokemonId {
  pub fn parse(input: &str) -> Result<Self, ApiError> {
    let input = input.trim();

    let segment = match Url::parse(input) {
      Ok(url) if matches!(url.scheme(), "http" | "https") => id_from_path(url.path()),
      _ => id_from_path(input),
    };

    match segment {
      Some(id) => Ok(Self(id.to_lowercase())),
      None => Err(ApiError::InvalidRequest {
        message: format!("not a Pokémon identifier: {:?}", input),
      }),
    }
  }

  #[cfg(test)]
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Path relative to the API base URL
  pub fn path(&self) -> String {
    format!("pokemon/{}", self.0)
  }
}

impl From<u64> for PokemonId {
  fn from(id: u64) -> Self {
    Self(id.to_string())
  }
}

impl fmt::Display for PokemonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Pick the id out of `.../pokemon/{id}/`, `pokemon/{id}` or `{id}`.
fn id_from_path(path: &str) -> Option<String> {
  let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

  let id = match segments.iter().rposition(|s| *s == "pokemon") {
    Some(pos) => segments.get(pos + 1).copied(),
    None if segments.len() == 1 => segments.first().copied(),
    // Some other resource family, e.g. `pokemon-species/1`
    None => None,
  }?;

  Some(id.to_string())
}

/// PokeAPI HTTP client.
///
/// Issues exactly one request per call and never retries; de-duplication
/// and retry policy live in the cache above it.
#[derive(Clone)]
pub struct PokeApiClient {
  http: reqwest::Client,
  base_url: Url,
}

impl PokeApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", config.base_url, e))?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("pokedex/", env!("CARGO_PKG_VERSION")))
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Fetch one page of the Pokémon list as raw JSON
  pub async fn fetch_list(&self, params: ListParams) -> Result<Value, ApiError> {
    validate_params(params)?;

    let mut url = self.endpoint("pokemon")?;
    url
      .query_pairs_mut()
      .append_pair("limit", &params.limit.to_string())
      .append_pair("offset", &params.offset().to_string());

    self.get_json(url, Operation::List).await
  }

  /// Fetch a single Pokémon as raw JSON
  pub async fn fetch_detail(&self, id: &PokemonId) -> Result<Value, ApiError> {
    let url = self.endpoint(&id.path())?;
    self.get_json(url, Operation::Detail).await
  }

  fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
    self.base_url.join(path).map_err(|e| ApiError::InvalidRequest {
      message: format!("cannot build URL for {}: {}", path, e),
    })
  }

  async fn get_json(&self, url: Url, operation: Operation) -> Result<Value, ApiError> {
    debug!(%url, ?operation, "GET");

    let response = self.http.get(url.clone()).send().await.map_err(|e| {
      warn!(%url, error = %e, "Request failed without a response");
      ApiError::transport(&e)
    })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.bytes().await.unwrap_or_default();
      let err = ApiError::from_response(status.as_u16(), &body, operation);
      warn!(%url, status = status.as_u16(), error = %err, "Request returned an error status");
      return Err(err);
    }

    let body = response.bytes().await.map_err(|e| {
      warn!(%url, error = %e, "Failed to read response body");
      ApiError::transport(&e)
    })?;

    serde_json::from_slice(&body).map_err(|e| ApiError::shape(format!("invalid JSON: {}", e)))
  }
}
