use crate::ui::components::TextInput;
use ratatui::prelude::*;

/// Truncate to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Price with the configured currency prefix and two decimals
pub fn format_price(currency: &str, price: f64) -> String {
  format!("{}{:.2}", currency, price)
}

const CATEGORY_COLORS: [Color; 6] = [
  Color::Cyan,
  Color::Magenta,
  Color::Yellow,
  Color::Green,
  Color::LightBlue,
  Color::LightRed,
];

/// Stable display color for a category name
pub fn category_color(category: &str) -> Color {
  let hash = category
    .bytes()
    .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
  CATEGORY_COLORS[hash % CATEGORY_COLORS.len()]
}

/// Prompt line for an overlay input with a block caret at the cursor
pub fn input_line<'a>(prefix: &'a str, input: &'a TextInput) -> Line<'a> {
  let (before, after) = input.split_at_cursor();
  let mut rest = after.chars();
  let at_cursor = rest.next().map(String::from).unwrap_or_else(|| " ".to_string());

  Line::from(vec![
    Span::styled(prefix, Style::default().fg(Color::Yellow)),
    Span::raw(before),
    Span::styled(at_cursor, Style::default().add_modifier(Modifier::REVERSED)),
    Span::raw(rest.as_str()),
  ])
}

/// Overlay anchored at the top-left of `area`, like the command line
pub fn top_left_overlay(area: Rect, height: u16) -> Rect {
  let width = (area.width * 60 / 100).clamp(30, 60);
  Rect::new(area.x + 1, area.y + 1, width, height).intersection(area)
}

/// Overlay centered in `area`, shrunk to fit
pub fn centered_overlay(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width.saturating_sub(4));
  let height = height.min(area.height.saturating_sub(2));
  let x = area.x + area.width.saturating_sub(width) / 2;
  let y = area.y + area.height.saturating_sub(height) / 2;
  Rect::new(x, y, width, height)
}
