use crate::cache::{CacheEvent, QueryCache, Transition};
use crate::catalog::listing::ViewFilter;
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction, ViewContext};
use crate::ui::views::{CategoryListView, ProductFormView, ProductListView};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  command_input: CommandInput,

  /// Handles given to every new view
  ctx: ViewContext,

  /// Store name shown in the header
  title: String,

  /// Cache transitions, summarised in the footer
  cache_events: broadcast::Receiver<CacheEvent>,
  status: Option<String>,

  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, categories: Vec<String>) -> Result<Self> {
    let client = CatalogClient::new(&config.api)?;
    info!(base_url = %client.base_url(), "using product service");

    let stale_secs = i64::try_from(config.cache.stale_secs)
      .ok()
      .and_then(chrono::Duration::try_seconds)
      .ok_or_else(|| eyre!("cache.stale_secs is too large: {}", config.cache.stale_secs))?;
    let cache = QueryCache::new(Arc::new(client), stale_secs);

    let ctx = ViewContext {
      cache,
      currency: config.currency.clone(),
    };
    let root = ProductListView::new(ctx.clone(), ViewFilter::with_categories(categories));

    Ok(Self {
      view_stack: vec![Box::new(root)],
      command_input: CommandInput::new(),
      cache_events: ctx.cache.events(),
      ctx,
      title: config.header_title(),
      status: None,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = self.event_loop(&mut terminal).await;
    restore_terminal()?;
    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) | Some(Event::Resize) => {}
        None => break,
      }
      // Poll after every event, not only on ticks
      self.tick();
    }

    info!("shutting down");
    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    let [header_area, main_area, footer_area] = Layout::vertical([
      Constraint::Length(1),
      Constraint::Min(1),
      Constraint::Length(1),
    ])
    .areas(frame.area());

    let breadcrumb = self.view_breadcrumb();

    if let Some(view) = self.view_stack.last_mut() {
      let context = view.context();
      draw_header(frame, header_area, &self.title, context.as_deref(), &view.shortcuts());
      view.render(frame, main_area);
    }

    draw_footer(frame, footer_area, &breadcrumb, self.status.as_deref());
    if self.command_input.is_active() {
      self.command_input.render_overlay(frame, main_area);
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let capturing = self.view_stack.last().is_some_and(|v| v.captures_input());
    if !capturing {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let quit_at_root = !capturing && key.code == KeyCode::Char('q');
    if let Some(view) = self.view_stack.last_mut() {
      let action = view.handle_key(key);
      self.apply(action, quit_at_root);
    }
  }

  fn tick(&mut self) {
    self.drain_cache_events();

    if let Some(view) = self.view_stack.last_mut() {
      let action = view.tick();
      self.apply(action, false);
    }
  }

  fn apply(&mut self, action: ViewAction, quit_at_root: bool) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        debug!(view = %view.breadcrumb_label(), "push view");
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else if quit_at_root {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!(command = cmd, "execute command");
    match cmd {
      "products" => self.replace_root(Box::new(ProductListView::new(
        self.ctx.clone(),
        ViewFilter::default(),
      ))),
      "categories" => self.replace_root(Box::new(CategoryListView::new(self.ctx.clone()))),
      "new" => self
        .view_stack
        .push(Box::new(ProductFormView::create(self.ctx.clone()))),
      "quit" => self.should_quit = true,
      "" => {}
      other => self.status = Some(format!("Unknown command: {}", other)),
    }
  }

  fn replace_root(&mut self, view: Box<dyn View>) {
    self.view_stack.clear();
    self.view_stack.push(view);
  }

  fn drain_cache_events(&mut self) {
    loop {
      match self.cache_events.try_recv() {
        Ok(event) => self.status = Some(describe(event)),
        Err(TryRecvError::Lagged(skipped)) => debug!(skipped, "cache events lagged"),
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
      }
    }
  }

  fn view_breadcrumb(&self) -> Vec<String> {
    self.view_stack.iter().map(|v| v.breadcrumb_label()).collect()
  }
}

/// Footer summary of a cache transition
fn describe(event: CacheEvent) -> String {
  let what = match event.transition {
    Transition::Stale => "stale",
    Transition::Loading => "loading...",
    Transition::Loaded => "loaded",
    Transition::Failed => "failed",
  };
  format!("{} {}", event.key, what)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
  enable_raw_mode()?;
  stdout().execute(EnterAlternateScreen)?;
  Ok(Terminal::new(CrosstermBackend::new(stdout()))?)
}

fn restore_terminal() -> Result<()> {
  if let Err(e) = disable_raw_mode() {
    warn!(error = %e, "failed to disable raw mode");
  }
  stdout().execute(LeaveAlternateScreen)?;
  Ok(())
}
