//! Serde-deserializable types matching PokeAPI responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::{Ability, EntityDetail, ListItem, PokemonType, Sprites, Stat};

// ============================================================================
// List endpoint response
// ============================================================================

/// `next`/`previous` links are ignored; pages are addressed by offset.
#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  pub count: u64,
  pub results: Vec<ListItem>,
}

// ============================================================================
// Detail endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiNamedResource {
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiTypeSlot {
  #[serde(default)]
  pub slot: u32,
  #[serde(rename = "type")]
  pub kind: ApiNamedResource,
}

#[derive(Debug, Deserialize)]
pub struct ApiAbilitySlot {
  #[serde(default)]
  pub is_hidden: bool,
  #[serde(default)]
  pub slot: u32,
  pub ability: ApiNamedResource,
}

#[derive(Debug, Deserialize)]
pub struct ApiStat {
  #[serde(default)]
  pub base_stat: u32,
  #[serde(default)]
  pub effort: u32,
  pub stat: ApiNamedResource,
}

#[derive(Debug, Deserialize)]
pub struct ApiArtwork {
  pub front_default: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiOtherSprites {
  #[serde(rename = "official-artwork")]
  pub official_artwork: Option<ApiArtwork>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSprites {
  pub front_default: Option<String>,
  pub front_shiny: Option<String>,
  pub front_female: Option<String>,
  pub front_shiny_female: Option<String>,
  pub back_default: Option<String>,
  pub back_shiny: Option<String>,
  pub back_female: Option<String>,
  pub back_shiny_female: Option<String>,
  pub other: Option<ApiOtherSprites>,
}

/// Pokémon record. Only `id` and `name` are required; every other field
/// may be absent or null.
#[derive(Debug, Deserialize)]
pub struct ApiPokemon {
  pub id: u64,
  pub name: String,
  pub height: Option<u32>,
  pub weight: Option<u32>,
  pub base_experience: Option<u32>,
  pub types: Option<Vec<ApiTypeSlot>>,
  pub abilities: Option<Vec<ApiAbilitySlot>>,
  pub stats: Option<Vec<ApiStat>>,
  pub sprites: Option<ApiSprites>,
}

impl From<ApiSprites> for Sprites {
  fn from(s: ApiSprites) -> Self {
    Sprites {
      front_default: s.front_default,
      front_shiny: s.front_shiny,
      front_female: s.front_female,
      front_shiny_female: s.front_shiny_female,
      back_default: s.back_default,
      back_shiny: s.back_shiny,
      back_female: s.back_female,
      back_shiny_female: s.back_shiny_female,
      official_artwork: s
        .other
        .and_then(|o| o.official_artwork)
        .and_then(|a| a.front_default),
    }
  }
}

impl ApiPokemon {
  pub fn into_detail(self) -> EntityDetail {
    EntityDetail {
      id: self.id,
      name: self.name,
      height: self.height.unwrap_or_default(),
      weight: self.weight.unwrap_or_default(),
      base_experience: self.base_experience,
      types: self
        .types
        .unwrap_or_default()
        .into_iter()
        .map(|t| PokemonType {
          slot: t.slot,
          type_name: t.kind.name,
        })
        .collect(),
      abilities: self
        .abilities
        .unwrap_or_default()
        .into_iter()
        .map(|a| Ability {
          ability_name: a.ability.name,
          is_hidden: a.is_hidden,
          slot: a.slot,
        })
        .collect(),
      stats: self
        .stats
        .unwrap_or_default()
        .into_iter()
        .map(|s| Stat {
          stat_name: s.stat.name,
          base_value: s.base_stat,
          effort: s.effort,
        })
        .collect(),
      sprites: self.sprites.map(Sprites::from),
    }
  }
}
