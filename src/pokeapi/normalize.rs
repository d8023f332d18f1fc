//! Mapping raw PokeAPI payloads into the shapes the views consume.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::api_types::{ApiListResponse, ApiPokemon};
use super::error::ApiError;
use super::types::{EntityDetail, ListPage, ListParams};

/// Shape a raw list payload into a [`ListPage`].
///
/// `results` and `count` are taken as-is; the pagination fields are derived
/// from `params`. A server that returns more rows than requested is cut back
/// to `params.limit`.
pub fn normalize_list(raw: &Value, params: ListParams) -> Result<ListPage, ApiError> {
  validate_params(params)?;

  let response = ApiListResponse::deserialize(raw)
    .map_err(|e| ApiError::shape(format!("list response: {}", e)))?;

  let mut results = response.results;
  let limit = params.limit as usize;
  if results.len() > limit {
    warn!(
      returned = results.len(),
      limit, "List endpoint returned more results than requested"
    );
    results.truncate(limit);
  }

  Ok(ListPage {
    results,
    count: response.count,
    total_pages: response.count.div_ceil(u64::from(params.limit)),
    current_page: params.page,
    items_per_page: params.limit,
  })
}

/// Shape a raw detail payload into an [`EntityDetail`].
///
/// Missing optional sections (sprites, types, ...) become `None` or empty;
/// a missing `id` or `name` is a shape error.
pub fn normalize_detail(raw: &Value) -> Result<EntityDetail, ApiError> {
  let pokemon = ApiPokemon::deserialize(raw)
    .map_err(|e| ApiError::shape(format!("detail response: {}", e)))?;

  Ok(pokemon.into_detail())
}

pub(crate) fn validate_params(params: ListParams) -> Result<(), ApiError> {
  if params.page == 0 || params.limit == 0 {
    return Err(ApiError::InvalidRequest {
      message: format!(
        "page and limit must be at least 1 (got page={}, limit={})",
        params.page, params.limit
      ),
    });
  }
  Ok(())
}
