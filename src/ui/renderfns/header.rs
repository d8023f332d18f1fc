use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::cache::CacheStats;
use crate::ui::view::ShortcutInfo;

/// Draw the header bar with app name, API host, cache stats and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  api_url: &str,
  stats: CacheStats,
  shortcuts: &[ShortcutInfo],
) {
  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", extract_domain(api_url)),
      Style::default().fg(Color::White),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" cache {} ", stats_summary(stats)),
      Style::default().fg(Color::Yellow),
    ),
    Span::raw(" "),
  ];

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    // Keys highlighted, descriptions dimmed
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}   ", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn stats_summary(stats: CacheStats) -> String {
  let mut summary = format!("{}/{} cached", stats.success, stats.total());
  if stats.pending > 0 {
    summary.push_str(&format!(", {} loading", stats.pending));
  }
  if stats.error > 0 {
    summary.push_str(&format!(", {} failed", stats.error));
  }
  summary
}

/// Extract host from the API base URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
