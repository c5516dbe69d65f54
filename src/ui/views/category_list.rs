use crate::cache::{QueryKey, QueryState};
use crate::catalog::listing::{category_counts, ViewFilter};
use crate::catalog::Product;
use crate::query::Query;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::category_color;
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crate::ui::views::ProductListView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::sync::Arc;

/// Category names with the number of products in each
pub struct CategoryListView {
  ctx: ViewContext,
  categories: Query<Arc<Vec<String>>>,
  products: Query<Arc<Vec<Product>>>,
  list_state: ListState,
}

impl CategoryListView {
  pub fn new(ctx: ViewContext) -> Self {
    let mut categories = Query::new(&ctx.cache, QueryKey::Categories);
    let mut products = Query::new(&ctx.cache, QueryKey::Products);
    categories.fetch();
    products.fetch();

    Self {
      ctx,
      categories,
      products,
      list_state: ListState::default(),
    }
  }

  fn categories(&self) -> &[String] {
    self.categories.data().map(|c| c.as_slice()).unwrap_or(&[])
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.categories().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.categories.state() {
      QueryState::Loading => " Categories (loading...) ".to_string(),
      QueryState::Failed(e) => format!(" Categories (error: {}) ", e),
      _ => format!(" Categories ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.categories.is_loading() {
      let content = if self.categories.is_error() {
        "Failed to load categories. Press 'r' to retry."
      } else {
        "No categories found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    // Counts are only known once the product list has loaded
    let products = self.products.data().map(|p| p.as_slice());
    let counts = products.map(category_counts);

    let items: Vec<ListItem> = self
      .categories()
      .iter()
      .map(|category| {
        let count = match &counts {
          Some(counts) => counts.get(category.as_str()).copied().unwrap_or(0).to_string(),
          None => "-".to_string(),
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<30}", category),
            Style::default().fg(category_color(category)),
          ),
          Span::styled(format!("{:>5}", count), Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for CategoryListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => {
        self.categories.refetch();
        self.products.refetch();
      }
      KeyCode::Enter => {
        let selected = self
          .list_state
          .selected()
          .and_then(|idx| self.categories().get(idx).cloned());
        if let Some(category) = selected {
          let filter = ViewFilter::with_categories([category]);
          return ViewAction::Push(Box::new(ProductListView::new(self.ctx.clone(), filter)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Categories".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if self.categories.poll() | self.products.poll() {
      let len = self.categories().len();
      ensure_valid_selection(&mut self.list_state, len);
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "products").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(80),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::FakeApi;
  use crossterm::event::KeyModifiers;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[tokio::test]
  async fn test_enter_opens_filtered_product_list() {
    let api = FakeApi::with_sample_products();
    let ctx = ViewContext {
      cache: api.cache(),
      currency: "$".to_string(),
    };
    let mut view = CategoryListView::new(ctx);
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();

    view.handle_key(key(KeyCode::Down));
    match view.handle_key(key(KeyCode::Enter)) {
      ViewAction::Push(next) => assert_eq!(next.breadcrumb_label(), "Products [home]"),
      _ => panic!("expected a pushed product list"),
    }

    // Both views read the same cached list
    assert_eq!(api.calls("list_products"), 1);
  }
}
