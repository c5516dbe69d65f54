//! Per-view handles onto the shared query cache.
//!
//! A `Query<T>` reads one cache key. A `Mutation<T>` tracks a single write.
//! Both are polled from the view's `tick()` so rendering never waits on the
//! network.
//!
//! # Example
//!
//! ```ignore
//! let mut products: Query<Arc<Vec<Product>>> = Query::new(&cache, QueryKey::Products);
//! products.fetch();
//!
//! // In event loop tick
//! if products.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match products.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Loaded(data) => render_data(data),
//!     QueryState::Failed(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use chrono::{DateTime, Utc};
use std::future::Future;
use tokio::sync::mpsc;

use crate::cache::{Cacheable, QueryCache, QueryKey, QueryState, Subscription};
use crate::catalog::ServiceError;

/// Typed read of one cache key.
///
/// Holds a subscription for its whole lifetime, so the key is refetched when a
/// mutation invalidates it while the owning view is mounted.
pub struct Query<T> {
  cache: QueryCache,
  key: QueryKey,
  _subscription: Subscription,
  state: QueryState<T>,
  /// Last loaded value, kept while a refetch is in flight or after a failure
  data: Option<T>,
  loaded_at: Option<DateTime<Utc>>,
  stale: bool,
  seen_version: Option<u64>,
}

impl<T: Cacheable> Query<T> {
  pub fn new(cache: &QueryCache, key: QueryKey) -> Self {
    Self {
      cache: cache.clone(),
      key,
      _subscription: cache.subscribe(key),
      state: QueryState::Idle,
      data: None,
      loaded_at: None,
      stale: false,
      seen_version: None,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Latest loaded data, even while refetching.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_failed()
  }

  pub fn error(&self) -> Option<&ServiceError> {
    self.state.error()
  }

  /// When the data was last loaded
  pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
    self.loaded_at
  }

  /// Invalidated and not yet reloaded
  pub fn is_stale(&self) -> bool {
    self.stale
  }

  /// Read through the cache: no request when the key is fresh or already loading.
  pub fn fetch(&mut self) {
    self.cache.ensure(self.key);
    self.poll();
  }

  /// Force a new request, superseding any in flight.
  pub fn refetch(&mut self) {
    self.cache.refetch(self.key);
    self.poll();
  }

  /// Pick up the cache's current state for this key.
  ///
  /// Returns `true` if the state changed since the last poll.
  pub fn poll(&mut self) -> bool {
    let snapshot = self.cache.snapshot(self.key);
    if self.seen_version == Some(snapshot.version) {
      return false;
    }
    self.seen_version = Some(snapshot.version);

    self.state = match snapshot.state {
      QueryState::Idle => QueryState::Idle,
      QueryState::Loading => QueryState::Loading,
      QueryState::Loaded(value) => {
        T::from_cached(&value).map_or(QueryState::Idle, QueryState::Loaded)
      }
      QueryState::Failed(e) => QueryState::Failed(e),
    };
    self.data = snapshot.data.as_ref().and_then(T::from_cached);
    self.loaded_at = snapshot.loaded_at;
    self.stale = snapshot.stale;
    true
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("seen_version", &self.seen_version)
      .finish_non_exhaustive()
  }
}

/// The state of a mutation
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  Idle,
  Pending,
  Success(T),
  Error(String),
}

/// A single in-flight write, polled like a query.
pub struct Mutation<T> {
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ServiceError>>>,
}

impl<T: Send + 'static> Default for Mutation<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn error(&self) -> Option<&str> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Run `future` in the background.
  ///
  /// Returns `false` without starting anything while a previous run is pending.
  pub fn start<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      // Ignore send errors - the owning view may be gone
      let _ = tx.send(future.await);
    });
    true
  }

  /// Returns `true` if the mutation finished since the last poll.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(value)) => {
        self.state = MutationState::Success(value);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = MutationState::Error(error.to_string());
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Error("Request was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  /// Take the result of a successful run, resetting to idle.
  pub fn take_success(&mut self) -> Option<T> {
    match std::mem::replace(&mut self.state, MutationState::Idle) {
      MutationState::Success(value) => Some(value),
      other => {
        self.state = other;
        None
      }
    }
  }
}
