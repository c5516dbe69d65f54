use crate::cache::{QueryKey, QueryState};
use crate::catalog::listing::{derive_view, SortOrder, ViewFilter};
use crate::catalog::Product;
use crate::query::{Mutation, Query};
use crate::ui::components::{
  CategoryPicker, CategoryPickerEvent, ConfirmDialog, ConfirmEvent, KeyResult, SearchEvent,
  SearchInput,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{category_color, format_price, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crate::ui::views::{ProductDetailView, ProductFormView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::sync::Arc;
use tracing::error;

/// Products after search, category filter and price sort
pub struct ProductListView {
  ctx: ViewContext,
  products: Query<Arc<Vec<Product>>>,
  categories: Query<Arc<Vec<String>>>,
  filter: ViewFilter,
  list_state: ListState,
  search: SearchInput,
  picker: CategoryPicker,
  confirm: ConfirmDialog,
  delete: Mutation<Product>,
  /// Product shown in the confirmation prompt
  pending_delete: Option<Product>,
  status: Option<String>,
}

impl ProductListView {
  pub fn new(ctx: ViewContext, filter: ViewFilter) -> Self {
    let mut products = Query::new(&ctx.cache, QueryKey::Products);
    let mut categories = Query::new(&ctx.cache, QueryKey::Categories);
    products.fetch();
    categories.fetch();

    Self {
      ctx,
      products,
      categories,
      filter,
      list_state: ListState::default(),
      search: SearchInput::new(),
      picker: CategoryPicker::new(),
      confirm: ConfirmDialog::new(),
      delete: Mutation::new(),
      pending_delete: None,
      status: None,
    }
  }

  fn all_products(&self) -> &[Product] {
    self.products.data().map(|p| p.as_slice()).unwrap_or(&[])
  }

  fn visible(&self) -> Vec<&Product> {
    derive_view(self.all_products(), &self.filter)
  }

  fn selected_product(&self) -> Option<Product> {
    let idx = self.list_state.selected()?;
    self.visible().get(idx).map(|p| (*p).clone())
  }

  fn ask_delete(&mut self) {
    if self.delete.is_pending() {
      self.status = Some("A delete is already in progress".to_string());
      return;
    }
    if let Some(product) = self.selected_product() {
      self.confirm.show(format!("Delete \"{}\"?", product.title));
      self.pending_delete = Some(product);
    }
  }

  fn start_delete(&mut self) {
    let Some(product) = self.pending_delete.take() else {
      return;
    };
    let cache = self.ctx.cache.clone();
    self.status = Some(format!("Deleting \"{}\"...", product.title));
    self.delete.start(async move { cache.delete_product(product.id).await });
  }

  fn title(&self) -> String {
    let total = self.all_products().len();
    let shown = self.visible().len();
    let sort = match self.filter.sort {
      SortOrder::Unsorted => String::new(),
      order => format!(" price {}", order.indicator()),
    };

    match self.products.state() {
      QueryState::Loading if total == 0 => " Products (loading...) ".to_string(),
      QueryState::Loading => format!(" Products ({}/{}){} (refreshing...) ", shown, total, sort),
      QueryState::Failed(e) => format!(" Products{} (error: {}) ", sort, e),
      _ if self.products.is_stale() => format!(" Products ({}/{}){} (stale) ", shown, total, sort),
      _ => format!(" Products ({}/{}){} ", shown, total, sort),
    }
  }

  fn render_filters(&self, frame: &mut Frame, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let search = match self.search.query() {
      "" => Span::styled("none", label),
      query => Span::styled(format!("\"{}\"", query), Style::default().fg(Color::Yellow)),
    };

    let mut spans = vec![
      Span::styled(" Search: ", label),
      search,
      Span::styled("  │  ", label),
      Span::styled("Categories: ", label),
      Span::styled(self.filter.categories_label(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(loaded_at) = self.products.loaded_at() {
      let local = loaded_at.with_timezone(&chrono::Local);
      spans.push(Span::styled("  │  ", label));
      spans.push(Span::styled(format!("Updated {}", local.format("%H:%M:%S")), label));
    }
    if let Some(status) = &self.status {
      spans.push(Span::styled("  │  ", label));
      spans.push(Span::styled(status.as_str(), Style::default().fg(Color::White)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = if self.products.is_loading() {
        "Loading products..."
      } else if self.products.is_error() && self.products.data().is_none() {
        "Failed to load products. Press 'r' to retry."
      } else {
        "No products found"
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let [header_area, list_area] =
      Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    let header = Line::from(format!(
      "  {:<40} {:>10}  {:<18} {}",
      "TITLE", "PRICE", "CATEGORY", "DESCRIPTION"
    ))
    .style(Style::default().fg(Color::DarkGray).bold());
    frame.render_widget(header, header_area);

    let currency = self.ctx.currency.as_str();
    let items: Vec<ListItem> = self
      .visible()
      .into_iter()
      .map(|product| {
        ListItem::new(Line::from(vec![
          Span::raw(format!("{:<40}", truncate(&product.title, 40))),
          Span::raw(" "),
          Span::styled(
            format!("{:>10}", format_price(currency, product.price)),
            Style::default().fg(Color::Green),
          ),
          Span::raw("  "),
          Span::styled(
            format!("{:<18}", truncate(&product.category, 18)),
            Style::default().fg(category_color(&product.category)),
          ),
          Span::raw(" "),
          Span::styled(truncate(&product.description, 60), Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut self.list_state);
  }
}

impl View for ProductListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.start_delete();
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending_delete = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.picker.handle_key(key) {
      KeyResult::Event(CategoryPickerEvent::Toggled(category)) => {
        self.filter.toggle_category(&category);
        return ViewAction::None;
      }
      KeyResult::Event(CategoryPickerEvent::Cleared) => {
        self.filter.clear_categories();
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.filter.search = query;
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('c') => {
        let categories = self.categories.data().map(|c| c.as_slice()).unwrap_or(&[]);
        self.picker.show(categories, &self.filter.categories);
      }
      KeyCode::Char('s') => self.filter.cycle_sort(),
      KeyCode::Char('r') => {
        self.products.refetch();
        self.categories.refetch();
      }
      KeyCode::Char('n') => {
        return ViewAction::Push(Box::new(ProductFormView::create(self.ctx.clone())));
      }
      KeyCode::Char('e') => {
        if let Some(product) = self.selected_product() {
          return ViewAction::Push(Box::new(ProductFormView::edit(self.ctx.clone(), &product)));
        }
      }
      KeyCode::Char('d') => self.ask_delete(),
      KeyCode::Enter => {
        if let Some(product) = self.selected_product() {
          return ViewAction::Push(Box::new(ProductDetailView::new(
            self.ctx.clone(),
            product.id,
            product.title,
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [filter_area, list_area] =
      Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(area);

    self.render_filters(frame, filter_area);
    self.render_list(frame, list_area);

    self.search.render_overlay(frame, list_area);
    self.picker.render_overlay(frame, list_area);
    self.confirm.render_overlay(frame, list_area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.filter.categories.len() {
      0 => "Products".to_string(),
      1 => format!(
        "Products [{}]",
        self.filter.categories.iter().next().map(String::as_str).unwrap_or_default()
      ),
      n => format!("Products [{} categories]", n),
    }
  }

  fn context(&self) -> Option<String> {
    Some(self.filter.categories_label())
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.picker.is_active() || self.confirm.is_active()
  }

  fn tick(&mut self) -> ViewAction {
    if self.products.poll() | self.categories.poll() {
      let len = self.visible().len();
      ensure_valid_selection(&mut self.list_state, len);
    }

    if self.delete.poll() {
      if let Some(product) = self.delete.take_success() {
        self.status = Some(format!("Deleted \"{}\"", product.title));
      } else if let Some(e) = self.delete.error() {
        error!(error = %e, "delete failed");
        self.status = Some(e.to_string());
      }
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("c", "categories").with_priority(30),
      ShortcutInfo::new("s", "sort").with_priority(40),
      ShortcutInfo::new("n", "new").with_priority(50),
      ShortcutInfo::new("e", "edit").with_priority(60),
      ShortcutInfo::new("d", "delete").with_priority(70),
      ShortcutInfo::new("r", "refresh").with_priority(80),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
