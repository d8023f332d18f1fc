use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::cache::CacheSource;
use crate::pokeapi::cached_client::CachedPokeApi;
use crate::pokeapi::client::PokemonId;
use crate::pokeapi::types::EntityDetail;
use crate::query::Query;
use crate::ui::renderfns::{capitalize, humanize, stat_bar, type_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

const STAT_BAR_WIDTH: usize = 20;

/// View for displaying a single Pokémon
pub struct PokemonDetailView {
  api: CachedPokeApi,
  id: PokemonId,
  /// Name from the list row, shown until the record loads
  name: String,
  query: Query<EntityDetail>,
  scroll: u16,
}

impl PokemonDetailView {
  pub fn new(api: CachedPokeApi, id: PokemonId, name: String) -> Self {
    let fetch_api = api.clone();
    let fetch_id = id.clone();
    let mut query = Query::new(api.subscribe_detail(&id), move || {
      let api = fetch_api.clone();
      let id = fetch_id.clone();
      async move { api.detail(&id).await }
    });

    // Start fetching immediately
    query.fetch();

    Self {
      api,
      id,
      name,
      query,
      scroll: 0,
    }
  }

  fn refresh(&mut self) {
    self.api.invalidate_detail(&self.id);
    self.query.refetch();
  }

  fn title(&self) -> String {
    let name = capitalize(&self.name);
    if self.query.is_loading() {
      format!(" {} (loading...) ", name)
    } else if self.query.is_fetching() {
      format!(" {} (updating...) ", name)
    } else {
      match self.query.data() {
        Some(detail) => format!(" {} #{} ", capitalize(&detail.name), detail.id),
        None => format!(" {} ", name),
      }
    }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Loading Pokémon details...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(detail) = self.query.data() else {
      if let Some(error) = self.query.error() {
        let paragraph =
          Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error.user_message()))
            .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, inner);
      }
      return;
    };

    // A failed refresh keeps the last good record on screen under the error
    let mut lines = Vec::new();
    if let Some(error) = self.query.error() {
      lines.push(Line::from(Span::styled(
        format!("Error: {}  Press 'r' to retry.", error.user_message()),
        Style::default().fg(Color::Red).bold(),
      )));
      lines.push(Line::default());
    }
    lines.extend(detail_lines(detail));

    if let Some(fetched_at) = self.query.fetched_at() {
      let mut fetched = vec![
        label("Fetched: "),
        Span::styled(
          fetched_at.with_timezone(&Local).format("%H:%M:%S").to_string(),
          Style::default().fg(Color::DarkGray),
        ),
      ];
      if let Some(source) = self.query.source() {
        fetched.push(Span::styled(
          format!(" ({})", source_label(source)),
          Style::default().fg(Color::DarkGray),
        ));
      }
      lines.push(Line::default());
      lines.push(Line::from(fetched));
    }

    let paragraph = Paragraph::new(lines)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, inner);
  }
}

fn source_label(source: CacheSource) -> &'static str {
  match source {
    CacheSource::Network => "network",
    CacheSource::InFlight => "shared request",
    CacheSource::Cache => "cache",
  }
}

fn label(text: &'static str) -> Span<'static> {
  Span::styled(text, Style::default().fg(Color::DarkGray))
}

fn section(text: &'static str) -> Line<'static> {
  Line::from(Span::styled(text, Style::default().fg(Color::Cyan).bold()))
}

fn detail_lines(detail: &EntityDetail) -> Vec<Line<'static>> {
  let mut lines = vec![
    Line::from(vec![
      label("Name: "),
      Span::styled(capitalize(&detail.name), Style::default().bold()),
      Span::styled(format!("  #{}", detail.id), Style::default().fg(Color::Cyan)),
    ]),
    Line::from(vec![
      label("Height: "),
      Span::raw(format!("{:.1} m", detail.height_m())),
      Span::raw("   "),
      label("Weight: "),
      Span::raw(format!("{:.1} kg", detail.weight_kg())),
      Span::raw("   "),
      label("Base experience: "),
      Span::raw(
        detail
          .base_experience
          .map(|exp| exp.to_string())
          .unwrap_or_else(|| "unknown".to_string()),
      ),
    ]),
  ];

  let mut types = vec![label("Types: ")];
  for kind in &detail.types {
    types.push(Span::styled(
      format!("{} ", capitalize(&kind.type_name)),
      Style::default().fg(type_color(&kind.type_name)).bold(),
    ));
  }
  lines.push(Line::from(types));

  lines.push(Line::default());
  lines.push(section("Abilities"));
  for ability in &detail.abilities {
    let mut spans = vec![Span::raw(format!(
      "  {}",
      capitalize(&humanize(&ability.ability_name))
    ))];
    if ability.is_hidden {
      spans.push(Span::styled(" (Hidden)", Style::default().fg(Color::Yellow)));
    }
    lines.push(Line::from(spans));
  }

  lines.push(Line::default());
  lines.push(section("Base Stats"));
  for stat in &detail.stats {
    lines.push(Line::from(vec![
      Span::raw(format!(
        "  {:<16}{:>4} ",
        capitalize(&humanize(&stat.stat_name)),
        stat.base_value
      )),
      Span::styled(
        stat_bar(stat.base_value, STAT_BAR_WIDTH),
        Style::default().fg(Color::Green),
      ),
    ]));
  }

  if let Some(sprite) = detail.sprites.as_ref().and_then(|s| s.primary()) {
    lines.push(Line::default());
    lines.push(Line::from(vec![label("Sprite: "), Span::raw(sprite.to_string())]));
  }

  lines
}

impl View for PokemonDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    capitalize(&self.name)
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("r", "refresh").with_priority(10),
      ShortcutInfo::new("j/k", "scroll").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
