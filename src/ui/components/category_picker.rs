use super::KeyResult;
use crate::ui::renderfns::centered_overlay;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};
use std::collections::BTreeSet;

/// Events emitted by the category picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryPickerEvent {
  /// One category was selected or deselected
  Toggled(String),
  /// Every category was deselected
  Cleared,
}

/// Multi-select overlay over the fetched category names.
///
/// Space toggles the highlighted category, `x` clears the selection, Enter or
/// Esc closes the picker. Changes apply immediately.
#[derive(Debug, Clone, Default)]
pub struct CategoryPicker {
  active: bool,
  categories: Vec<String>,
  selected: BTreeSet<String>,
  cursor: usize,
}

impl CategoryPicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open with the available categories and the current selection
  pub fn show(&mut self, categories: &[String], selected: &BTreeSet<String>) {
    self.active = true;
    self.categories = categories.to_vec();
    self.selected = selected.clone();
    self.cursor = 0;
  }

  fn hide(&mut self) {
    self.active = false;
    self.categories.clear();
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CategoryPickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    let count = self.categories.len();
    match key.code {
      KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('c') => {
        self.hide();
        KeyResult::Handled
      }
      KeyCode::Char('j') | KeyCode::Down if count > 0 => {
        self.cursor = (self.cursor + 1) % count;
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up if count > 0 => {
        self.cursor = (self.cursor + count - 1) % count;
        KeyResult::Handled
      }
      KeyCode::Char(' ') => match self.categories.get(self.cursor) {
        Some(category) => {
          let category = category.clone();
          if !self.selected.remove(&category) {
            self.selected.insert(category.clone());
          }
          KeyResult::Event(CategoryPickerEvent::Toggled(category))
        }
        None => KeyResult::Handled,
      },
      KeyCode::Char('x') => {
        self.selected.clear();
        KeyResult::Event(CategoryPickerEvent::Cleared)
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let longest = self.categories.iter().map(|c| c.chars().count()).max().unwrap_or(10);
    let width = (longest as u16 + 10).max(36);
    let height = self.categories.len().max(1) as u16 + 3;
    let overlay_area = centered_overlay(area, width, height);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Categories ")
      .title_bottom(Line::from(" space:toggle  x:clear  enter:close ").centered());

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if self.categories.is_empty() {
      frame.render_widget(
        Line::styled("No categories loaded", Style::default().fg(Color::DarkGray)),
        inner,
      );
      return;
    }

    let items: Vec<ListItem> = self
      .categories
      .iter()
      .map(|category| {
        let (mark, style) = if self.selected.contains(category) {
          ("[x] ", Style::default().fg(Color::Green))
        } else {
          ("[ ] ", Style::default().fg(Color::Cyan))
        };
        ListItem::new(Line::from(vec![
          Span::styled(mark, style),
          Span::styled(category.as_str(), style),
        ]))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default().with_selected(Some(self.cursor));
    frame.render_stateful_widget(list, inner, &mut state);
  }
}
