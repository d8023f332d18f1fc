use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::pokeapi::cached_client::CachedPokeApi;
use crate::pokeapi::types::{ListPage, ListParams};
use crate::query::Query;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{capitalize, format_count, global_index, page_window, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

const TITLE: &str = "Pokémon Explorer";

/// Paginated list of every Pokémon
pub struct PokemonListView {
  api: CachedPokeApi,
  params: ListParams,
  query: Query<ListPage>,
  /// Last page shown, kept on screen until the requested page arrives
  previous: Option<Arc<ListPage>>,
  list_state: ListState,
}

impl PokemonListView {
  pub fn new(api: CachedPokeApi, params: ListParams) -> Self {
    let query = list_query(&api, params);
    Self {
      api,
      params,
      query,
      previous: None,
      list_state: ListState::default(),
    }
  }

  pub fn params(&self) -> ListParams {
    self.params
  }

  /// The page currently on screen: the requested one once loaded, the
  /// previous one until then.
  fn page(&self) -> Option<&ListPage> {
    self.query.data().or(self.previous.as_deref())
  }

  fn total_pages(&self) -> Option<u64> {
    self.page().map(|page| page.total_pages)
  }

  fn go_to_page(&mut self, page: u32) {
    let last = self
      .total_pages()
      .map(|total| u32::try_from(total.max(1)).unwrap_or(u32::MAX))
      .unwrap_or(u32::MAX);
    let page = page.clamp(1, last);
    if page == self.params.page {
      return;
    }

    if let Some(shown) = self.query.shared_data() {
      self.previous = Some(Arc::clone(shown));
    }
    self.params = ListParams::new(page, self.params.limit);
    self.query = list_query(&self.api, self.params);
    self.list_state.select(Some(0));
  }

  fn refresh(&mut self) {
    self.api.invalidate_list(self.params);
    self.query.refetch();
  }

  fn selected_item(&self) -> Option<&crate::pokeapi::types::ListItem> {
    let idx = self.list_state.selected()?;
    self.page()?.results.get(idx)
  }

  fn subtitle(&self) -> Line<'static> {
    let mut spans = Vec::new();
    if let Some(page) = self.page() {
      spans.push(Span::styled(
        format!(
          " {} Pokémon • Page {} of {} ",
          format_count(page.count),
          page.current_page,
          page.total_pages
        ),
        Style::default().fg(Color::DarkGray),
      ));
    }
    if self.query.is_fetching() && self.page().is_some() {
      spans.push(Span::styled(
        "Updating... ",
        Style::default().fg(Color::Yellow),
      ));
    }
    Line::from(spans)
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", TITLE))
      .title_bottom(self.subtitle())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.query.data().is_none() {
      let message = if let Some(error) = self.query.error() {
        Some((
          format!("Error: {}\n\nPress 'r' to retry.", error.user_message()),
          Color::Red,
        ))
      } else if self.previous.is_none() {
        Some(("Loading Pokémon...".to_string(), Color::DarkGray))
      } else {
        None
      };
      if let Some((content, color)) = message {
        let paragraph = Paragraph::new(content)
          .block(block)
          .style(Style::default().fg(color));
        frame.render_widget(paragraph, area);
        return;
      }
    }

    let Some(page) = self.page() else {
      frame.render_widget(block, area);
      return;
    };

    // The page on screen is stale when the latest load failed
    let area = match self.query.error() {
      Some(error) => {
        let chunks = Layout::default()
          .direction(Direction::Vertical)
          .constraints([Constraint::Length(1), Constraint::Min(1)])
          .split(area);
        let banner = Paragraph::new(format!(
          " Error: {}  Press 'r' to retry.",
          error.user_message()
        ))
        .style(Style::default().fg(Color::Red).bold());
        frame.render_widget(banner, chunks[0]);
        chunks[1]
      }
      None => area,
    };

    if page.results.is_empty() {
      let paragraph = Paragraph::new("No Pokémon found.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = page
      .results
      .iter()
      .enumerate()
      .map(|(i, item)| {
        let number = global_index(page.current_page, page.items_per_page, i);
        ListItem::new(Line::from(vec![
          Span::styled(format!("#{:<6}", number), Style::default().fg(Color::Cyan)),
          Span::raw(" "),
          Span::raw(truncate(&capitalize(&item.name), 40)),
        ]))
      })
      .collect();
    let len = items.len();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    ensure_valid_selection(&mut self.list_state, len);
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn pagination_line(&self, total: u64) -> Line<'static> {
    let current = u64::from(self.params.page);
    let key = Style::default().fg(Color::Cyan);
    let dim = Style::default().fg(Color::DarkGray);
    let (back, forward) = (
      if current > 1 { key } else { dim },
      if current < total { key } else { dim },
    );

    let mut spans = vec![
      Span::styled("<g> first", back),
      Span::raw("  "),
      Span::styled("<h> prev", back),
      Span::raw("  "),
    ];
    for page in page_window(current, total) {
      if page == current {
        spans.push(Span::styled(
          format!("[{}]", page),
          Style::default().fg(Color::Yellow).bold(),
        ));
      } else {
        spans.push(Span::styled(format!(" {} ", page), Style::default().fg(Color::White)));
      }
      spans.push(Span::raw(" "));
    }
    spans.extend([
      Span::raw(" "),
      Span::styled("next <l>", forward),
      Span::raw("  "),
      Span::styled("last <G>", forward),
    ]);
    Line::from(spans)
  }
}

fn list_query(api: &CachedPokeApi, params: ListParams) -> Query<ListPage> {
  let fetch_api = api.clone();
  let mut query = Query::new(api.subscribe_list(params), move || {
    let api = fetch_api.clone();
    async move { api.list_page(params).await }
  });
  query.fetch();
  query
}

impl View for PokemonListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('l') | KeyCode::Right => self.go_to_page(self.params.page.saturating_add(1)),
      KeyCode::Char('h') | KeyCode::Left => self.go_to_page(self.params.page.saturating_sub(1)),
      KeyCode::Char('g') | KeyCode::Home => self.go_to_page(1),
      KeyCode::Char('G') | KeyCode::End => {
        if let Some(total) = self.total_pages() {
          self.go_to_page(u32::try_from(total).unwrap_or(u32::MAX));
        }
      }
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Enter => {
        if let Some(item) = self.selected_item() {
          return ViewAction::Select(item.clone());
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let total = self.total_pages().unwrap_or(0);
    if total <= 1 {
      self.render_list(frame, area);
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);
    self.render_list(frame, chunks[0]);
    frame.render_widget(
      Paragraph::new(self.pagination_line(total)).alignment(Alignment::Center),
      chunks[1],
    );
  }

  fn breadcrumb_label(&self) -> String {
    format!("Pokémon [page {}]", self.params.page)
  }

  fn tick(&mut self) {
    if self.query.poll() && self.query.data().is_some() {
      self.previous = None;
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "details").with_priority(10),
      ShortcutInfo::new("h/l", "page").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(50),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pokeapi::fixtures::{cached_api, list_page};
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use std::time::Duration;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn mount_page(server: &MockServer, offset: &str, names: &[&str], first_id: u64) {
    Mock::given(method("GET"))
      .and(path("/api/v2/pokemon"))
      .and(query_param("offset", offset))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(list_page(1302, names, first_id)),
      )
      .mount(server)
      .await;
  }

  async fn settle(view: &mut PokemonListView) {
    for _ in 0..200 {
      view.tick();
      if !view.query.is_fetching() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("list query never settled");
  }

  fn screen(view: &mut PokemonListView) -> String {
    let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
    terminal.draw(|frame| view.render(frame, frame.area())).unwrap();
    terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect()
  }

  #[tokio::test]
  async fn test_renders_page_with_global_numbers() {
    let server = MockServer::start().await;
    mount_page(&server, "20", &["spearow", "fearow"], 21).await;

    let mut view = PokemonListView::new(cached_api(&server), ListParams::new(2, 20));
    settle(&mut view).await;

    let screen = screen(&mut view);
    assert!(screen.contains("Pokémon Explorer"));
    assert!(screen.contains("1,302 Pokémon • Page 2 of 66"));
    assert!(screen.contains("#21"));
    assert!(screen.contains("Spearow"));
    assert!(screen.contains("[2]"));
  }

  #[tokio::test]
  async fn test_enter_selects_highlighted_row() {
    let server = MockServer::start().await;
    mount_page(&server, "0", &["bulbasaur", "ivysaur"], 1).await;

    let mut view = PokemonListView::new(cached_api(&server), ListParams::new(1, 20));
    settle(&mut view).await;
    screen(&mut view);

    view.handle_key(press(KeyCode::Down));
    match view.handle_key(press(KeyCode::Enter)) {
      ViewAction::Select(item) => assert_eq!(item.name, "ivysaur"),
      other => panic!("expected selection, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_previous_page_stays_visible_while_next_loads() {
    let server = MockServer::start().await;
    mount_page(&server, "0", &["bulbasaur"], 1).await;
    Mock::given(method("GET"))
      .and(path("/api/v2/pokemon"))
      .and(query_param("offset", "20"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(list_page(1302, &["spearow"], 21))
          .set_delay(Duration::from_millis(300)),
      )
      .mount(&server)
      .await;

    let mut view = PokemonListView::new(cached_api(&server), ListParams::new(1, 20));
    settle(&mut view).await;

    view.handle_key(press(KeyCode::Char('l')));
    assert_eq!(view.params().page, 2);
    view.tick();

    let during = screen(&mut view);
    assert!(during.contains("Bulbasaur"));
    assert!(during.contains("Updating..."));

    settle(&mut view).await;
    let after = screen(&mut view);
    assert!(after.contains("Spearow"));
    assert!(!after.contains("Updating..."));
  }

  #[tokio::test]
  async fn test_page_keys_clamp_to_range() {
    let server = MockServer::start().await;
    mount_page(&server, "0", &["bulbasaur"], 1).await;
    mount_page(&server, "1300", &["terapagos", "pecharunt"], 1301).await;

    let mut view = PokemonListView::new(cached_api(&server), ListParams::new(1, 20));
    settle(&mut view).await;

    view.handle_key(press(KeyCode::Char('h')));
    assert_eq!(view.params().page, 1);

    view.handle_key(press(KeyCode::Char('G')));
    assert_eq!(view.params().page, 66);
    settle(&mut view).await;

    view.handle_key(press(KeyCode::Char('l')));
    assert_eq!(view.params().page, 66);
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_rows_and_shows_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v2/pokemon"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(list_page(1302, &["bulbasaur", "ivysaur"], 1)),
      )
      .up_to_n_times(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/v2/pokemon"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let mut view = PokemonListView::new(cached_api(&server), ListParams::new(1, 20));
    settle(&mut view).await;
    assert!(!screen(&mut view).contains("Error:"));

    view.handle_key(press(KeyCode::Char('r')));
    settle(&mut view).await;

    let screen = screen(&mut view);
    assert!(screen.contains("Error: Failed to fetch Pokemon"));
    assert!(screen.contains("Bulbasaur"));
    assert!(screen.contains("Ivysaur"));
  }

  #[tokio::test]
  async fn test_error_shows_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v2/pokemon"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let mut view = PokemonListView::new(cached_api(&server), ListParams::new(1, 20));
    settle(&mut view).await;

    let screen = screen(&mut view);
    assert!(screen.contains("Failed to fetch Pokemon"));
    assert!(screen.contains("Press 'r' to retry."));
  }
}
