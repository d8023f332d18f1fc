use ratatui::prelude::Color;
use std::ops::RangeInclusive;

/// Number of page buttons shown in the pagination bar
pub const VISIBLE_PAGES: u64 = 5;

/// Highest base stat in the games, used to scale stat bars
pub const MAX_BASE_STAT: u32 = 255;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Upper-case the first letter: "bulbasaur" -> "Bulbasaur"
pub fn capitalize(name: &str) -> String {
  let mut chars = name.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Display form of an API slug; only the first dash becomes a space
pub fn humanize(slug: &str) -> String {
  slug.replacen('-', " ", 1)
}

/// Format a count with thousands separators: 1302 -> "1,302"
pub fn format_count(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

/// 1-based position of row `index` on `page` across the whole list
pub fn global_index(page: u32, per_page: u32, index: usize) -> u64 {
  u64::from(page.saturating_sub(1)) * u64::from(per_page) + index as u64 + 1
}

/// Pages to show as buttons: up to `VISIBLE_PAGES`, centered on `current`
/// where possible and clamped to `1..=total`.
pub fn page_window(current: u64, total: u64) -> RangeInclusive<u64> {
  if total == 0 {
    return 1..=0;
  }
  let current = current.clamp(1, total);
  let mut start = current.saturating_sub(VISIBLE_PAGES / 2).max(1);
  let end = (start + VISIBLE_PAGES - 1).min(total);
  if end - start + 1 < VISIBLE_PAGES {
    start = end.saturating_sub(VISIBLE_PAGES - 1).max(1);
  }
  start..=end
}

/// Horizontal bar for a base stat, `width` cells at `MAX_BASE_STAT`
pub fn stat_bar(value: u32, width: usize) -> String {
  let filled = (value.min(MAX_BASE_STAT) as usize * width).div_ceil(MAX_BASE_STAT as usize);
  format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Get the display color for a Pokémon type
pub fn type_color(type_name: &str) -> Color {
  match type_name {
    "grass" | "bug" => Color::Green,
    "fire" | "fighting" => Color::Red,
    "water" | "ice" => Color::Blue,
    "electric" => Color::Yellow,
    "poison" | "ghost" => Color::Magenta,
    "psychic" | "fairy" => Color::LightMagenta,
    "ground" | "rock" => Color::LightYellow,
    "dragon" | "flying" => Color::Cyan,
    _ => Color::White,
  }
}
