//! Core traits and types for the query cache.

use crate::catalog::{Product, ServiceError};
use std::fmt;
use std::sync::Arc;

/// Identifies one cached read: the operation plus its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
  /// The full product list
  Products,
  /// A single product by id
  Product(u64),
  /// The category names
  Categories,
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      QueryKey::Products => write!(f, "products"),
      QueryKey::Product(id) => write!(f, "product:{}", id),
      QueryKey::Categories => write!(f, "categories"),
    }
  }
}

/// A value held by the cache. Shared so readers never copy product lists.
#[derive(Debug, Clone)]
pub enum CachedValue {
  Products(Arc<Vec<Product>>),
  Product(Arc<Product>),
  Categories(Arc<Vec<String>>),
}

/// Types a [`crate::query::Query`] can read out of a [`CachedValue`].
pub trait Cacheable: Clone + Send + Sync + 'static {
  fn from_cached(value: &CachedValue) -> Option<Self>;
}

impl Cacheable for Arc<Vec<Product>> {
  fn from_cached(value: &CachedValue) -> Option<Self> {
    match value {
      CachedValue::Products(products) => Some(Arc::clone(products)),
      _ => None,
    }
  }
}

impl Cacheable for Arc<Product> {
  fn from_cached(value: &CachedValue) -> Option<Self> {
    match value {
      CachedValue::Product(product) => Some(Arc::clone(product)),
      _ => None,
    }
  }
}

impl Cacheable for Arc<Vec<String>> {
  fn from_cached(value: &CachedValue) -> Option<Self> {
    match value {
      CachedValue::Categories(categories) => Some(Arc::clone(categories)),
      _ => None,
    }
  }
}

/// The state of one cache key
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Never fetched
  Idle,
  /// A request is in flight
  Loading,
  /// The latest request succeeded
  Loaded(T),
  /// The latest request failed
  Failed(ServiceError),
}

impl<T> Default for QueryState<T> {
  fn default() -> Self {
    QueryState::Idle
  }
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_loaded(&self) -> bool {
    matches!(self, QueryState::Loaded(_))
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, QueryState::Failed(_))
  }

  pub fn error(&self) -> Option<&ServiceError> {
    match self {
      QueryState::Failed(e) => Some(e),
      _ => None,
    }
  }
}

/// A transition of one key, broadcast to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// Marked stale by a mutation
  Stale,
  Loading,
  Loaded,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEvent {
  pub key: QueryKey,
  pub transition: Transition,
}
