mod app;
mod cache;
mod config;
mod event;
mod logging;
mod pokeapi;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

use crate::pokeapi::cached_client::CachedPokeApi;
use crate::pokeapi::client::PokeApiClient;

#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(about = "A terminal catalog viewer for the PokeAPI, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./pokedex.yaml or $XDG_CONFIG_HOME/pokedex/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base URL, e.g. https://pokeapi.co/api/v2/
  #[arg(long)]
  base_url: Option<String>,

  /// Rows per list page
  #[arg(long)]
  page_size: Option<u32>,

  /// List page to open on start
  #[arg(short, long, default_value_t = 1)]
  page: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line wins over the config file
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }
  if let Some(page_size) = args.page_size {
    config.list.page_size = page_size;
  }
  let config = config.validated()?;

  info!(
    base_url = %config.api.base_url,
    page_size = config.list.page_size,
    "Starting pokedex"
  );

  let client = PokeApiClient::new(&config.api)?;
  let api = CachedPokeApi::new(client, config.cache.cache_config());
  let janitors = api.spawn_janitors(config.cache.sweep_interval());

  // Initialize and run the app
  let mut app = app::App::new(config, api.clone(), args.page);
  let result = app.run().await;

  for janitor in janitors {
    janitor.abort();
  }
  api.clear();
  result
}
