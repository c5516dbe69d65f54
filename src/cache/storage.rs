//! In-memory per-key entry storage.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;

use super::traits::{CachedValue, QueryKey, QueryState};
use crate::catalog::ServiceError;

/// A request shared by every caller reading the same key
pub(super) type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, ServiceError>>>;

/// Point-in-time view of one key.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub state: QueryState<CachedValue>,
  /// Last successfully loaded value, kept while a refetch is in flight
  pub data: Option<CachedValue>,
  pub stale: bool,
  pub loaded_at: Option<DateTime<Utc>>,
  /// Bumped on every transition of this key
  pub version: u64,
}

#[derive(Default)]
pub(super) struct Entry {
  pub state: QueryState<CachedValue>,
  pub data: Option<CachedValue>,
  pub stale: bool,
  pub loaded_at: Option<DateTime<Utc>>,
  pub version: u64,
  /// Generation of the most recently issued request
  pub generation: u64,
  pub in_flight: Option<SharedFetch>,
  /// Number of mounted consumers
  pub subscribers: usize,
}

impl Entry {
  /// A loaded value that can be served without a request
  pub fn fresh_value(&self, now: DateTime<Utc>, stale_time: Duration) -> Option<CachedValue> {
    match (&self.state, self.loaded_at) {
      (QueryState::Loaded(value), Some(loaded_at))
        if !self.stale && now - loaded_at < stale_time =>
      {
        Some(value.clone())
      }
      _ => None,
    }
  }

  pub fn snapshot(&self) -> Snapshot {
    Snapshot {
      state: self.state.clone(),
      data: self.data.clone(),
      stale: self.stale,
      loaded_at: self.loaded_at,
      version: self.version,
    }
  }
}

/// All entries, keyed by query
#[derive(Default)]
pub(super) struct Storage {
  entries: HashMap<QueryKey, Entry>,
}

impl Storage {
  pub fn get(&self, key: &QueryKey) -> Option<&Entry> {
    self.entries.get(key)
  }

  pub fn get_mut(&mut self, key: &QueryKey) -> Option<&mut Entry> {
    self.entries.get_mut(key)
  }

  pub fn entry(&mut self, key: QueryKey) -> &mut Entry {
    self.entries.entry(key).or_default()
  }
}
