use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::pokeapi::types::ListItem;

/// Key hint rendered in the header bar
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  /// Sort order in the header, ascending
  pub priority: u8,
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// What the App should do after a view handled a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
  /// Key was consumed locally
  None,
  /// Open the detail view for a list row
  Select(ListItem),
  /// Pop current view from stack (go back, or quit from the root)
  Pop,
}

/// A screen on the App's view stack.
///
/// Remote data is held in a `Query<T>` and polled from `tick()`; selection
/// and navigation are reported back as a `ViewAction`.
pub trait View {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Label shown for this view in the footer trail
  fn breadcrumb_label(&self) -> String;

  /// Poll outstanding queries
  fn tick(&mut self) {}

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("q", "back").with_priority(30)]
  }
}
