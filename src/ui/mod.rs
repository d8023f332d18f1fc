pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  renderfns::draw_header(
    frame,
    chunks[0],
    app.title(),
    app.api_url(),
    app.cache_stats(),
    &app.shortcuts(),
  );
  renderfns::draw_footer(frame, chunks[2], &app.view_breadcrumb());

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }
}

/// Keep a list selection inside `0..len`, selecting the first row when
/// nothing is selected yet.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}
