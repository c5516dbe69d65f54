use crate::cache::QueryKey;
use crate::catalog::form::{FormErrors, FormField, ProductDraft};
use crate::catalog::Product;
use crate::query::{Mutation, Query};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::renderfns::{centered_overlay, input_line};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Create or edit form.
///
/// Invalid drafts never reach the service. A valid submit starts a single
/// create or update; the form closes when it succeeds and stays open with the
/// error when it fails.
pub struct ProductFormView {
  ctx: ViewContext,
  /// Id of the product being edited, `None` when creating
  editing: Option<u64>,
  draft: ProductDraft,
  errors: FormErrors,
  focus: usize,
  /// Editor for the focused text field
  input: TextInput,
  categories: Query<Arc<Vec<String>>>,
  save: Mutation<Product>,
  submit_error: Option<String>,
}

impl ProductFormView {
  pub fn create(ctx: ViewContext) -> Self {
    Self::with_draft(ctx, None, ProductDraft::default())
  }

  pub fn edit(ctx: ViewContext, product: &Product) -> Self {
    Self::with_draft(ctx, Some(product.id), ProductDraft::from_product(product))
  }

  fn with_draft(ctx: ViewContext, editing: Option<u64>, draft: ProductDraft) -> Self {
    let mut categories = Query::new(&ctx.cache, QueryKey::Categories);
    categories.fetch();
    let input = TextInput::with_value(draft.get(FormField::ALL[0]));

    Self {
      ctx,
      editing,
      draft,
      errors: FormErrors::default(),
      focus: 0,
      input,
      categories,
      save: Mutation::new(),
      submit_error: None,
    }
  }

  fn focused(&self) -> FormField {
    FormField::ALL[self.focus]
  }

  fn move_focus(&mut self, forward: bool) {
    let count = FormField::ALL.len();
    self.focus = if forward {
      (self.focus + 1) % count
    } else {
      (self.focus + count - 1) % count
    };
    self.input = TextInput::with_value(self.draft.get(self.focused()));
  }

  /// Step through the fetched categories
  fn cycle_category(&mut self, forward: bool) {
    let categories = self.categories.data().map(|c| c.as_slice()).unwrap_or(&[]);
    let count = categories.len();
    if count == 0 {
      return;
    }

    let current = categories.iter().position(|c| *c == self.draft.category);
    let next = match (current, forward) {
      (None, true) => 0,
      (None, false) => count - 1,
      (Some(i), true) => (i + 1) % count,
      (Some(i), false) => (i + count - 1) % count,
    };
    self.draft.category = categories[next].clone();
  }

  fn submit(&mut self) {
    if self.save.is_pending() {
      return;
    }

    let data = match self.draft.validate() {
      Ok(data) => data,
      Err(errors) => {
        debug!(invalid_fields = errors.len(), "form rejected");
        self.errors = errors;
        return;
      }
    };

    self.errors = FormErrors::default();
    self.submit_error = None;
    let cache = self.ctx.cache.clone();
    match self.editing {
      Some(id) => self.save.start(async move { cache.update_product(id, data).await }),
      None => self.save.start(async move { cache.create_product(data).await }),
    };
  }

  fn field_lines(&self, field: FormField, focused: bool) -> Vec<Line<'_>> {
    let label_style = if focused {
      Style::default().fg(Color::Yellow).bold()
    } else {
      Style::default().fg(Color::White)
    };
    let mut lines = vec![Line::styled(field.label(), label_style)];

    let value = self.draft.get(field);
    let value_line = match field {
      FormField::Category => {
        let shown = if value.is_empty() { field.placeholder() } else { value };
        let style = if value.is_empty() {
          Style::default().fg(Color::DarkGray)
        } else {
          Style::default().fg(Color::Cyan)
        };
        let arrows = if focused { ("  ◀ ", " ▶") } else { ("    ", "") };
        Line::from(vec![Span::raw(arrows.0), Span::styled(shown, style), Span::raw(arrows.1)])
      }
      _ if focused => input_line("  > ", &self.input),
      _ if value.is_empty() => {
        Line::styled(format!("    {}", field.placeholder()), Style::default().fg(Color::DarkGray))
      }
      _ => Line::raw(format!("    {}", value)),
    };
    lines.push(value_line);

    match self.errors.get(field) {
      Some(message) => lines.push(Line::styled(
        format!("    {}", message),
        Style::default().fg(Color::Red),
      )),
      None => lines.push(Line::raw("")),
    }
    lines
  }

  fn status_line(&self) -> Line<'_> {
    if self.save.is_pending() {
      Line::styled("Saving...", Style::default().fg(Color::Yellow))
    } else if let Some(e) = &self.submit_error {
      Line::styled(e.as_str(), Style::default().fg(Color::Red))
    } else {
      Line::styled(
        "enter:save  tab:next field  ←/→:category  esc:cancel",
        Style::default().fg(Color::DarkGray),
      )
    }
  }
}

impl View for ProductFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Enter => self.submit(),
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => self.submit(),
      KeyCode::Tab | KeyCode::Down => self.move_focus(true),
      KeyCode::BackTab | KeyCode::Up => self.move_focus(false),
      code if self.focused() == FormField::Category => match code {
        KeyCode::Left => self.cycle_category(false),
        KeyCode::Right | KeyCode::Char(' ') => self.cycle_category(true),
        _ => {}
      },
      _ => {
        if self.input.handle_key(key) == InputResult::Consumed {
          let field = self.focused();
          self.draft.set(field, self.input.value().to_string());
        }
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let rows = FormField::ALL.len() as u16 * 3 + 3;
    let form_area = centered_overlay(area, 72, rows);
    frame.render_widget(Clear, form_area);

    let title = match self.editing {
      Some(id) => format!(" Edit product #{} ", id),
      None => " New product ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));

    let mut lines: Vec<Line> = FormField::ALL
      .iter()
      .enumerate()
      .flat_map(|(i, field)| self.field_lines(*field, i == self.focus))
      .collect();
    lines.push(self.status_line());

    frame.render_widget(Paragraph::new(lines).block(block), form_area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.editing {
      Some(id) => format!("Edit #{}", id),
      None => "New product".to_string(),
    }
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn tick(&mut self) -> ViewAction {
    self.categories.poll();

    if self.save.poll() {
      if let Some(product) = self.save.take_success() {
        info!(id = product.id, title = %product.title, "product saved");
        return ViewAction::Pop;
      }
      if let Some(e) = self.save.error() {
        error!(error = %e, "failed to save product");
        self.submit_error = Some(e.to_string());
      }
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "save").with_priority(10),
      ShortcutInfo::new("tab", "next field").with_priority(20),
      ShortcutInfo::new("esc", "cancel").with_priority(90),
    ]
  }
}
