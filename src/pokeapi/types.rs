use serde::Deserialize;

/// Lightweight reference to a Pokémon, as returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListItem {
  pub name: String,
  pub url: String,
}

/// One page of the Pokémon list, with pagination metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
  pub results: Vec<ListItem>,
  pub count: u64,
  pub total_pages: u64,
  pub current_page: u32,
  pub items_per_page: u32,
}

/// Full record for a single Pokémon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDetail {
  pub id: u64,
  pub name: String,
  /// Decimetres
  pub height: u32,
  /// Hectograms
  pub weight: u32,
  pub base_experience: Option<u32>,
  pub types: Vec<PokemonType>,
  pub abilities: Vec<Ability>,
  pub stats: Vec<Stat>,
  pub sprites: Option<Sprites>,
}

impl EntityDetail {
  pub fn height_m(&self) -> f64 {
    f64::from(self.height) / 10.0
  }

  pub fn weight_kg(&self) -> f64 {
    f64::from(self.weight) / 10.0
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokemonType {
  pub slot: u32,
  pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ability {
  pub ability_name: String,
  pub is_hidden: bool,
  pub slot: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
  pub stat_name: String,
  pub base_value: u32,
  pub effort: u32,
}

/// Sprite image URLs; any of them may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sprites {
  pub front_default: Option<String>,
  pub front_shiny: Option<String>,
  pub front_female: Option<String>,
  pub front_shiny_female: Option<String>,
  pub back_default: Option<String>,
  pub back_shiny: Option<String>,
  pub back_female: Option<String>,
  pub back_shiny_female: Option<String>,
  pub official_artwork: Option<String>,
}

impl Sprites {
  /// Best image to show for this Pokémon
  pub fn primary(&self) -> Option<&str> {
    self
      .front_default
      .as_deref()
      .or(self.official_artwork.as_deref())
  }
}

/// Pagination parameters for the list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListParams {
  pub page: u32,
  pub limit: u32,
}

impl ListParams {
  pub fn new(page: u32, limit: u32) -> Self {
    Self { page, limit }
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
  }
}

impl Default for ListParams {
  fn default() -> Self {
    Self { page: 1, limit: 20 }
  }
}
