use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2/";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Custom title for header (defaults to "pokedex")
  pub title: Option<String>,
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub list: ListConfig,
  #[serde(default)]
  pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Per-request timeout; an expired timeout surfaces as a transport error
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListConfig {
  #[serde(default = "default_page_size")]
  pub page_size: u32,
}

impl Default for ListConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
  /// How long an unused query result is kept
  #[serde(default = "default_retention_secs")]
  pub retention_secs: u64,
  /// How often expired entries are swept
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      retention_secs: default_retention_secs(),
      sweep_interval_secs: default_sweep_interval_secs(),
    }
  }
}

impl CacheSettings {
  pub fn cache_config(&self) -> CacheConfig {
    CacheConfig {
      retention: Duration::from_secs(self.retention_secs),
    }
  }

  pub fn sweep_interval(&self) -> Duration {
    Duration::from_secs(self.sweep_interval_secs.max(1))
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_page_size() -> u32 {
  20
}

fn default_retention_secs() -> u64 {
  300
}

fn default_sweep_interval_secs() -> u64 {
  60
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pokedex.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pokedex/config.yaml
  ///
  /// With no file anywhere the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    config.validated()
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("pokedex.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pokedex").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Normalize and check values that would otherwise fail much later.
  pub fn validated(mut self) -> Result<Self> {
    if !self.api.base_url.ends_with('/') {
      self.api.base_url.push('/');
    }
    url::Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url {}: {}", self.api.base_url, e))?;

    if self.list.page_size == 0 {
      return Err(eyre!("list.page_size must be at least 1"));
    }

    Ok(self)
  }

  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("pokedex")
  }
}
