use crate::cache::{QueryKey, QueryState};
use crate::catalog::Product;
use crate::query::Query;
use crate::ui::renderfns::{category_color, format_price};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crate::ui::views::ProductFormView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::sync::Arc;

/// Single product read through its own cache key
pub struct ProductDetailView {
  ctx: ViewContext,
  title: String,
  query: Query<Arc<Product>>,
}

impl ProductDetailView {
  pub fn new(ctx: ViewContext, id: u64, title: String) -> Self {
    let mut query = Query::new(&ctx.cache, QueryKey::Product(id));
    query.fetch();
    Self { ctx, title, query }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading => format!(" {} (loading...) ", self.title),
      QueryState::Failed(e) => format!(" {} (error: {}) ", self.title, e),
      _ => format!(" {} ", self.title),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let product = match self.query.data() {
      Some(product) => product,
      None if self.query.is_error() => {
        let message = self.query.error().map(|e| e.to_string()).unwrap_or_default();
        let paragraph = Paragraph::new(format!("{}\n\nPress 'r' to retry.", message))
          .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, inner);
        return;
      }
      None => {
        let paragraph =
          Paragraph::new("Loading product...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, inner);
        return;
      }
    };

    let [fields_area, separator_area, description_area] = Layout::vertical([
      Constraint::Length(5),
      Constraint::Length(1),
      Constraint::Min(1),
    ])
    .areas(inner);

    let label = Style::default().fg(Color::DarkGray);
    let rating = match product.rating {
      Some(rating) => format!("{:.1} / 5 ({} reviews)", rating.rate, rating.count),
      None => "No rating".to_string(),
    };

    let fields = vec![
      Line::from(vec![
        Span::styled("Title:    ", label),
        Span::styled(product.title.as_str(), Style::default().bold()),
      ]),
      Line::from(vec![
        Span::styled("Price:    ", label),
        Span::styled(
          format_price(&self.ctx.currency, product.price),
          Style::default().fg(Color::Green),
        ),
      ]),
      Line::from(vec![
        Span::styled("Category: ", label),
        Span::styled(
          product.category.as_str(),
          Style::default().fg(category_color(&product.category)),
        ),
      ]),
      Line::from(vec![
        Span::styled("Rating:   ", label),
        Span::styled(rating, Style::default().fg(Color::Yellow)),
      ]),
      Line::from(vec![
        Span::styled("Image:    ", label),
        Span::styled(product.image.as_str(), Style::default().fg(Color::Cyan)),
      ]),
    ];
    frame.render_widget(Paragraph::new(fields), fields_area);

    let separator = "─".repeat(separator_area.width as usize);
    frame.render_widget(Paragraph::new(separator).style(label), separator_area);

    let description = Paragraph::new(product.description.as_str()).wrap(Wrap { trim: true });
    frame.render_widget(description, description_area);
  }
}

impl View for ProductDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('e') => {
        if let Some(product) = self.query.data() {
          return ViewAction::Push(Box::new(ProductFormView::edit(self.ctx.clone(), product)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.title.clone()
  }

  fn tick(&mut self) -> ViewAction {
    if self.query.poll() && self.query.state().is_loaded() {
      if let Some(product) = self.query.data() {
        self.title = product.title.clone();
      }
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("e", "edit").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(80),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::FakeApi;
  use crate::catalog::ProductFormData;
  use std::time::Duration;

  #[tokio::test]
  async fn test_title_follows_updates() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();
    let ctx = ViewContext {
      cache: cache.clone(),
      currency: "$".to_string(),
    };
    let mut view = ProductDetailView::new(ctx, 1, "Shirt".to_string());
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();
    assert_eq!(view.query.data().map(|p| p.price), Some(20.0));

    let data = ProductFormData {
      title: "Linen Shirt".to_string(),
      price: 25.0,
      description: "Light".to_string(),
      category: "clothes".to_string(),
      image: "https://example.com/1.png".to_string(),
    };
    cache.update_product(1, data).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();

    assert_eq!(view.breadcrumb_label(), "Linen Shirt");
  }
}
