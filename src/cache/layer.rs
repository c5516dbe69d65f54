//! Query cache that orchestrates keyed reads, request de-duplication and
//! invalidation after mutations.

use chrono::{Duration, Utc};
use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::storage::{SharedFetch, Snapshot, Storage};
use super::traits::{CacheEvent, CachedValue, QueryKey, QueryState, Transition};
use crate::catalog::client::ApiFuture;
use crate::catalog::{CatalogApi, Product, ProductFormData, ServiceError};

const EVENT_CAPACITY: usize = 64;

/// Keyed cache in front of the product service.
///
/// Cloning is cheap and every clone shares the same entries. Create one at
/// startup and hand it to each view.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Inner>,
}

struct Inner {
  api: Arc<dyn CatalogApi>,
  storage: Mutex<Storage>,
  events: broadcast::Sender<CacheEvent>,
  /// How long a loaded value is served before a read refetches it
  stale_time: Duration,
}

enum Lookup {
  Fresh(CachedValue),
  Pending(SharedFetch),
}

impl Inner {
  fn lock(&self) -> MutexGuard<'_, Storage> {
    self.storage.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn emit(&self, key: QueryKey, transition: Transition) {
    // No receivers is fine
    let _ = self.events.send(CacheEvent { key, transition });
  }

  fn request(&self, key: QueryKey) -> ApiFuture<CachedValue> {
    match key {
      QueryKey::Products => self
        .api
        .list_products()
        .map(|r| r.map(|p| CachedValue::Products(Arc::new(p))))
        .boxed(),
      QueryKey::Product(id) => self
        .api
        .get_product(id)
        .map(|r| r.map(|p| CachedValue::Product(Arc::new(p))))
        .boxed(),
      QueryKey::Categories => self
        .api
        .list_categories()
        .map(|r| r.map(|c| CachedValue::Categories(Arc::new(c))))
        .boxed(),
    }
  }

  /// Issue a new request for `key`, superseding any request in flight.
  ///
  /// The request runs on its own task so its result is recorded even when
  /// every caller has gone away.
  fn start_request(self: &Arc<Self>, storage: &mut Storage, key: QueryKey) -> SharedFetch {
    let entry = storage.entry(key);
    entry.generation += 1;
    entry.version += 1;
    entry.state = QueryState::Loading;
    let generation = entry.generation;

    let request = self.request(key);
    let inner = Arc::clone(self);
    let handle = tokio::spawn(async move {
      let result = request.await;
      inner.complete(key, generation, &result);
      result
    });

    let shared = async move {
      handle
        .await
        .unwrap_or_else(|e| Err(ServiceError::new("load query", e.to_string())))
    }
    .boxed()
    .shared();

    entry.in_flight = Some(shared.clone());
    debug!(%key, generation, "request started");
    self.emit(key, Transition::Loading);
    shared
  }

  /// Record a response, unless a newer request for the key was issued since
  fn complete(&self, key: QueryKey, generation: u64, result: &Result<CachedValue, ServiceError>) {
    let mut storage = self.lock();
    let Some(entry) = storage.get_mut(&key) else {
      return;
    };

    if entry.generation != generation {
      debug!(%key, generation, latest = entry.generation, "discarding superseded response");
      return;
    }

    entry.in_flight = None;
    entry.version += 1;
    match result {
      Ok(value) => {
        entry.state = QueryState::Loaded(value.clone());
        entry.data = Some(value.clone());
        entry.stale = false;
        entry.loaded_at = Some(Utc::now());
        debug!(%key, generation, "request completed");
        self.emit(key, Transition::Loaded);
      }
      Err(e) => {
        warn!(%key, operation = e.operation(), error = e.message(), "request failed");
        entry.state = QueryState::Failed(e.clone());
        self.emit(key, Transition::Failed);
      }
    }
  }
}

impl QueryCache {
  pub fn new(api: Arc<dyn CatalogApi>, stale_time: Duration) -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Self {
      inner: Arc::new(Inner {
        api,
        storage: Mutex::new(Storage::default()),
        events,
        stale_time,
      }),
    }
  }

  /// Register a mounted consumer of `key` for as long as the guard lives.
  ///
  /// Invalidation refetches only keys that have at least one consumer.
  pub fn subscribe(&self, key: QueryKey) -> Subscription {
    self.inner.lock().entry(key).subscribers += 1;
    Subscription {
      inner: Arc::clone(&self.inner),
      key,
    }
  }

  /// Observe every key transition from now on
  pub fn events(&self) -> broadcast::Receiver<CacheEvent> {
    self.inner.events.subscribe()
  }

  /// Current state of `key`; unknown keys are idle
  pub fn snapshot(&self, key: QueryKey) -> Snapshot {
    let storage = self.inner.lock();
    match storage.get(&key) {
      Some(entry) => entry.snapshot(),
      None => Snapshot {
        state: QueryState::Idle,
        data: None,
        stale: false,
        loaded_at: None,
        version: 0,
      },
    }
  }

  fn lookup(&self, key: QueryKey, force: bool) -> Lookup {
    let mut storage = self.inner.lock();

    if !force {
      if let Some(entry) = storage.get(&key) {
        if let Some(value) = entry.fresh_value(Utc::now(), self.inner.stale_time) {
          return Lookup::Fresh(value);
        }
        if let Some(pending) = &entry.in_flight {
          return Lookup::Pending(pending.clone());
        }
      }
    }

    Lookup::Pending(self.inner.start_request(&mut storage, key))
  }

  /// Read `key`, serving a fresh cached value or joining the request in flight
  #[allow(dead_code)]
  pub async fn fetch(&self, key: QueryKey) -> Result<CachedValue, ServiceError> {
    match self.lookup(key, false) {
      Lookup::Fresh(value) => Ok(value),
      Lookup::Pending(pending) => pending.await,
    }
  }

  /// Like [`fetch`](Self::fetch) without waiting for the result
  pub fn ensure(&self, key: QueryKey) {
    let _ = self.lookup(key, false);
  }

  /// Start a new request even if the key is fresh or already loading
  pub fn refetch(&self, key: QueryKey) {
    let _ = self.lookup(key, true);
  }

  /// Mark keys stale and refetch the ones with mounted consumers
  pub fn invalidate(&self, keys: &[QueryKey]) {
    let mut storage = self.inner.lock();

    for &key in keys {
      let Some(entry) = storage.get_mut(&key) else {
        continue;
      };
      entry.stale = true;
      entry.version += 1;
      let active = entry.subscribers > 0;

      debug!(%key, active, "invalidated");
      self.inner.emit(key, Transition::Stale);

      if active {
        let _ = self.inner.start_request(&mut storage, key);
      } else {
        // Drop any request issued before the write so its answer is discarded
        entry.generation += 1;
        if entry.in_flight.take().is_some() {
          entry.state = match &entry.data {
            Some(value) => QueryState::Loaded(value.clone()),
            None => QueryState::Idle,
          };
        }
      }
    }
  }

  /// Create a product and invalidate the product list
  pub async fn create_product(&self, data: ProductFormData) -> Result<Product, ServiceError> {
    let product = self.inner.api.create_product(data).await?;
    info!(id = product.id, title = %product.title, "product created");
    self.invalidate(&[QueryKey::Products]);
    Ok(product)
  }

  /// Update a product and invalidate both the list and the product itself
  pub async fn update_product(
    &self,
    id: u64,
    data: ProductFormData,
  ) -> Result<Product, ServiceError> {
    let product = self.inner.api.update_product(id, data).await?;
    info!(id, title = %product.title, "product updated");
    self.invalidate(&[QueryKey::Products, QueryKey::Product(id)]);
    Ok(product)
  }

  /// Delete a product and invalidate both the list and the product itself
  pub async fn delete_product(&self, id: u64) -> Result<Product, ServiceError> {
    let product = self.inner.api.delete_product(id).await?;
    info!(id, title = %product.title, "product deleted");
    self.invalidate(&[QueryKey::Products, QueryKey::Product(id)]);
    Ok(product)
  }
}

/// Marks a key as having a mounted consumer until dropped
pub struct Subscription {
  inner: Arc<Inner>,
  key: QueryKey,
}

impl Drop for Subscription {
  fn drop(&mut self) {
    let mut storage = self.inner.lock();
    if let Some(entry) = storage.get_mut(&self.key) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::FakeApi;
  use std::time::Duration as StdDuration;
  use tokio::time::{sleep, timeout};

  fn product_ids(value: &CachedValue) -> Vec<u64> {
    match value {
      CachedValue::Products(products) => products.iter().map(|p| p.id).collect(),
      other => panic!("expected products, got {:?}", other),
    }
  }

  fn form_data(title: &str) -> ProductFormData {
    ProductFormData {
      title: title.to_string(),
      price: 5.0,
      description: "New".to_string(),
      category: "home".to_string(),
      image: "https://example.com/new.png".to_string(),
    }
  }

  async fn next_transition(
    rx: &mut broadcast::Receiver<CacheEvent>,
    key: QueryKey,
  ) -> Transition {
    loop {
      let event = timeout(StdDuration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for cache event")
        .expect("event channel closed");
      if event.key == key {
        return event.transition;
      }
    }
  }

  #[tokio::test]
  async fn test_read_through_serves_cached_value() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();

    let first = cache.fetch(QueryKey::Products).await.unwrap();
    let second = cache.fetch(QueryKey::Products).await.unwrap();

    assert_eq!(product_ids(&first), vec![1, 2]);
    assert_eq!(product_ids(&second), vec![1, 2]);
    assert_eq!(api.calls("list_products"), 1);
    assert!(cache.snapshot(QueryKey::Products).state.is_loaded());
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_request() {
    let api = FakeApi::with_sample_products();
    api.push_delay(StdDuration::from_millis(50));
    let cache = api.cache();

    let (a, b) = tokio::join!(
      cache.fetch(QueryKey::Products),
      cache.fetch(QueryKey::Products)
    );

    assert_eq!(product_ids(&a.unwrap()), vec![1, 2]);
    assert_eq!(product_ids(&b.unwrap()), vec![1, 2]);
    assert_eq!(api.calls("list_products"), 1);
  }

  #[tokio::test]
  async fn test_concurrent_failure_reaches_every_caller() {
    let api = FakeApi::with_sample_products();
    api.push_delay(StdDuration::from_millis(20));
    api.set_failing(true);
    let cache = api.cache();

    let (a, b) = tokio::join!(
      cache.fetch(QueryKey::Categories),
      cache.fetch(QueryKey::Categories)
    );

    assert!(a.is_err());
    assert_eq!(a.unwrap_err(), b.unwrap_err());
    assert_eq!(api.calls("list_categories"), 1);
  }

  #[tokio::test]
  async fn test_expired_value_is_refetched() {
    let api = FakeApi::with_sample_products();
    let cache = QueryCache::new(Arc::new(api.clone()), Duration::zero());

    cache.fetch(QueryKey::Categories).await.unwrap();
    cache.fetch(QueryKey::Categories).await.unwrap();

    assert_eq!(api.calls("list_categories"), 2);
  }

  #[tokio::test]
  async fn test_failure_is_captured_per_key() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();

    api.set_failing(true);
    let err = cache.fetch(QueryKey::Products).await.unwrap_err();
    assert_eq!(err.operation(), "fetch products");

    api.set_failing(false);
    assert!(cache.fetch(QueryKey::Categories).await.is_ok());

    let snapshot = cache.snapshot(QueryKey::Products);
    assert_eq!(snapshot.state.error(), Some(&err));
    assert!(cache.snapshot(QueryKey::Categories).state.is_loaded());
  }

  #[tokio::test]
  async fn test_failed_key_can_be_retried() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();

    api.set_failing(true);
    assert!(cache.fetch(QueryKey::Product(1)).await.is_err());

    api.set_failing(false);
    let value = cache.fetch(QueryKey::Product(1)).await.unwrap();
    assert!(matches!(value, CachedValue::Product(p) if p.title == "Shirt"));
  }

  #[tokio::test]
  async fn test_create_invalidates_product_list() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();
    let _sub = cache.subscribe(QueryKey::Products);
    cache.fetch(QueryKey::Products).await.unwrap();

    let mut rx = cache.events();
    let created = cache.create_product(form_data("Lamp")).await.unwrap();

    assert_eq!(next_transition(&mut rx, QueryKey::Products).await, Transition::Stale);
    assert_eq!(next_transition(&mut rx, QueryKey::Products).await, Transition::Loading);
    assert_eq!(next_transition(&mut rx, QueryKey::Products).await, Transition::Loaded);

    let snapshot = cache.snapshot(QueryKey::Products);
    assert!(product_ids(snapshot.data.as_ref().unwrap()).contains(&created.id));
    assert!(!snapshot.stale);
    assert_eq!(api.calls("list_products"), 2);
  }

  #[tokio::test]
  async fn test_delete_transitions_stale_loading_loaded() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();
    let _sub = cache.subscribe(QueryKey::Products);
    cache.fetch(QueryKey::Products).await.unwrap();

    let mut rx = cache.events();
    let deleted = cache.delete_product(2).await.unwrap();
    assert_eq!(deleted.id, 2);

    assert_eq!(next_transition(&mut rx, QueryKey::Products).await, Transition::Stale);
    assert_eq!(next_transition(&mut rx, QueryKey::Products).await, Transition::Loading);
    assert_eq!(next_transition(&mut rx, QueryKey::Products).await, Transition::Loaded);

    let snapshot = cache.snapshot(QueryKey::Products);
    assert_eq!(product_ids(snapshot.data.as_ref().unwrap()), vec![1]);
  }

  #[tokio::test]
  async fn test_update_invalidates_list_and_product() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();
    let _list = cache.subscribe(QueryKey::Products);
    let _detail = cache.subscribe(QueryKey::Product(1));
    cache.fetch(QueryKey::Products).await.unwrap();
    cache.fetch(QueryKey::Product(1)).await.unwrap();

    let mut rx = cache.events();
    cache.update_product(1, form_data("Polo")).await.unwrap();

    while next_transition(&mut rx, QueryKey::Product(1)).await != Transition::Loaded {}

    match cache.snapshot(QueryKey::Product(1)).state {
      QueryState::Loaded(CachedValue::Product(p)) => assert_eq!(p.title, "Polo"),
      other => panic!("unexpected state {:?}", other),
    }
    assert_eq!(api.calls("get_product"), 2);
  }

  #[tokio::test]
  async fn test_failed_mutation_does_not_invalidate() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();
    let _sub = cache.subscribe(QueryKey::Products);
    cache.fetch(QueryKey::Products).await.unwrap();

    api.set_failing(true);
    assert!(cache.create_product(form_data("Lamp")).await.is_err());
    assert!(cache.delete_product(1).await.is_err());

    assert!(!cache.snapshot(QueryKey::Products).stale);
    assert_eq!(api.calls("list_products"), 1);
  }

  #[tokio::test]
  async fn test_superseded_response_is_discarded() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();

    // First request sees both products but answers late
    api.push_delay(StdDuration::from_millis(100));
    cache.refetch(QueryKey::Products);

    api.remove(2);
    cache.refetch(QueryKey::Products);

    sleep(StdDuration::from_millis(200)).await;

    let snapshot = cache.snapshot(QueryKey::Products);
    assert_eq!(product_ids(snapshot.data.as_ref().unwrap()), vec![1]);
    assert_eq!(api.calls("list_products"), 2);
  }

  #[tokio::test]
  async fn test_invalidation_skips_keys_without_consumers() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();

    let sub = cache.subscribe(QueryKey::Products);
    cache.fetch(QueryKey::Products).await.unwrap();
    drop(sub);

    cache.invalidate(&[QueryKey::Products]);
    sleep(StdDuration::from_millis(20)).await;

    assert!(cache.snapshot(QueryKey::Products).stale);
    assert_eq!(api.calls("list_products"), 1);

    // The next read no longer trusts the stale value
    cache.fetch(QueryKey::Products).await.unwrap();
    assert_eq!(api.calls("list_products"), 2);
    assert!(!cache.snapshot(QueryKey::Products).stale);
  }

  #[tokio::test]
  async fn test_invalidation_discards_read_started_before_mutation() {
    let api = FakeApi::with_sample_products();
    api.push_delay(StdDuration::from_millis(50));
    let cache = api.cache();

    cache.ensure(QueryKey::Products);
    cache.delete_product(2).await.unwrap();
    assert!(cache.snapshot(QueryKey::Products).stale);

    // The list read before the delete answers late and must not count as fresh
    sleep(StdDuration::from_millis(100)).await;
    let snapshot = cache.snapshot(QueryKey::Products);
    assert!(snapshot.stale);
    assert!(!snapshot.state.is_loading());

    let value = cache.fetch(QueryKey::Products).await.unwrap();
    assert_eq!(product_ids(&value), vec![1]);
    assert_eq!(api.calls("list_products"), 2);
    assert!(!cache.snapshot(QueryKey::Products).stale);
  }

  #[tokio::test]
  async fn test_abandoned_read_still_records_result() {
    let api = FakeApi::with_sample_products();
    api.push_delay(StdDuration::from_millis(30));
    let cache = api.cache();

    let read = timeout(StdDuration::from_millis(5), cache.fetch(QueryKey::Categories)).await;
    assert!(read.is_err());

    sleep(StdDuration::from_millis(60)).await;
    assert!(cache.snapshot(QueryKey::Categories).state.is_loaded());
    assert_eq!(api.calls("list_categories"), 1);
  }

  #[tokio::test]
  async fn test_ensure_does_not_duplicate_in_flight_request() {
    let api = FakeApi::with_sample_products();
    api.push_delay(StdDuration::from_millis(30));
    let cache = api.cache();

    cache.ensure(QueryKey::Products);
    cache.ensure(QueryKey::Products);
    assert!(cache.snapshot(QueryKey::Products).state.is_loading());

    let value = cache.fetch(QueryKey::Products).await.unwrap();
    assert_eq!(product_ids(&value), vec![1, 2]);
    assert_eq!(api.calls("list_products"), 1);
  }

  #[tokio::test]
  async fn test_unknown_key_snapshot_is_idle() {
    let api = FakeApi::with_sample_products();
    let cache = api.cache();
    let snapshot = cache.snapshot(QueryKey::Product(42));
    assert!(matches!(snapshot.state, QueryState::Idle));
    assert!(snapshot.data.is_none());
  }
}
