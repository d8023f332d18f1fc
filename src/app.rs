use crate::cache::CacheStats;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::pokeapi::cached_client::CachedPokeApi;
use crate::pokeapi::client::PokemonId;
use crate::pokeapi::types::{ListItem, ListParams};
use crate::ui;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{PokemonDetailView, PokemonListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  /// Navigation stack - the list is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// List row whose detail view is open
  selected_item: Option<ListItem>,

  /// Application configuration
  config: Config,

  /// Cached PokeAPI client shared by all views
  api: CachedPokeApi,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config, api: CachedPokeApi, start_page: u32) -> Self {
    let params = ListParams::new(start_page.max(1), config.list.page_size);
    let root: Box<dyn View> = Box::new(PokemonListView::new(api.clone(), params));

    Self {
      view_stack: vec![root],
      selected_item: None,
      config,
      api,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(TICK_RATE);
    info!("Event loop started");

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    info!("Event loop finished");
    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Pop,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Select(item) => self.select_item(item),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.clear_selection();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  /// Poll every view so background queries land even while hidden.
  fn tick(&mut self) {
    for view in &mut self.view_stack {
      view.tick();
    }
  }

  /// Open the detail view for a list row.
  pub fn select_item(&mut self, item: ListItem) {
    let id = match PokemonId::parse(&item.url) {
      Ok(id) => id,
      Err(e) => {
        warn!(url = %item.url, error = %e, "Ignoring selection with unusable url");
        return;
      }
    };

    debug!(name = %item.name, id = %id, "Selected Pokémon");
    self.view_stack.truncate(1);
    self.view_stack.push(Box::new(PokemonDetailView::new(
      self.api.clone(),
      id,
      item.name.clone(),
    )));
    self.selected_item = Some(item);
  }

  /// Close the detail view and go back to the list.
  pub fn clear_selection(&mut self) {
    self.view_stack.truncate(1);
    self.selected_item = None;
  }

  // Accessors for UI rendering
  pub fn selected_item(&self) -> Option<&ListItem> {
    self.selected_item.as_ref()
  }

  #[cfg(test)]
  pub fn should_quit(&self) -> bool {
    self.should_quit
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn title(&self) -> &str {
    self.config.title()
  }

  pub fn api_url(&self) -> &str {
    self.api.client().base_url().as_str()
  }

  pub fn cache_stats(&self) -> CacheStats {
    self.api.stats()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .view_stack
      .last()
      .map(|view| view.shortcuts())
      .unwrap_or_default()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}
