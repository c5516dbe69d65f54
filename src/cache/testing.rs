//! In-memory `CatalogApi` used by cache, query and view tests.

use chrono::Duration;
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::QueryCache;
use crate::catalog::client::ApiFuture;
use crate::catalog::{CatalogApi, Product, ProductFormData, ServiceError};

pub fn sample_product(id: u64, title: &str, price: f64, category: &str) -> Product {
  Product {
    id,
    title: title.to_string(),
    price,
    description: format!("{} description", title),
    category: category.to_string(),
    image: format!("https://example.com/{}.png", id),
    rating: None,
  }
}

/// Scripted service: responses reflect the data at the moment of the call
#[derive(Clone, Default)]
pub struct FakeApi {
  state: Arc<FakeState>,
}

#[derive(Default)]
struct FakeState {
  products: Mutex<Vec<Product>>,
  categories: Mutex<Vec<String>>,
  delays: Mutex<VecDeque<std::time::Duration>>,
  calls: Mutex<HashMap<&'static str, usize>>,
  failing: AtomicBool,
  next_id: AtomicU64,
}

impl FakeApi {
  /// Shirt (id 1, 20.0, clothes) and Mug (id 2, 10.0, home)
  pub fn with_sample_products() -> Self {
    Self::with_products(vec![
      sample_product(1, "Shirt", 20.0, "clothes"),
      sample_product(2, "Mug", 10.0, "home"),
    ])
  }

  pub fn with_products(products: Vec<Product>) -> Self {
    let api = Self::default();
    let mut categories: Vec<String> = products.iter().map(|p| p.category.clone()).collect();
    categories.sort();
    categories.dedup();

    let next_id = products.iter().map(|p| p.id).max().unwrap_or(0) + 1;
    api.state.next_id.store(next_id, Ordering::SeqCst);
    *api.state.products.lock().unwrap() = products;
    *api.state.categories.lock().unwrap() = categories;
    api
  }

  pub fn cache(&self) -> QueryCache {
    QueryCache::new(Arc::new(self.clone()), Duration::seconds(60))
  }

  /// Number of calls made to one operation
  pub fn calls(&self, op: &str) -> usize {
    self.state.calls.lock().unwrap().get(op).copied().unwrap_or(0)
  }

  /// Delay the next call by `delay`
  pub fn push_delay(&self, delay: std::time::Duration) {
    self.state.delays.lock().unwrap().push_back(delay);
  }

  pub fn set_failing(&self, failing: bool) {
    self.state.failing.store(failing, Ordering::SeqCst);
  }

  /// Remove a product behind the cache's back
  pub fn remove(&self, id: u64) {
    self.state.products.lock().unwrap().retain(|p| p.id != id);
  }

  fn respond<T, F>(&self, op: &'static str, operation: &'static str, handler: F) -> ApiFuture<T>
  where
    T: Send + 'static,
    F: FnOnce(&FakeState) -> Result<T, String>,
  {
    *self.state.calls.lock().unwrap().entry(op).or_insert(0) += 1;
    let delay = self.state.delays.lock().unwrap().pop_front();

    let result = if self.state.failing.load(Ordering::SeqCst) {
      Err(ServiceError::new(operation, "server responded with 500 Internal Server Error"))
    } else {
      handler(&self.state).map_err(|message| ServiceError::new(operation, message))
    };

    async move {
      if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
      }
      result
    }
    .boxed()
  }
}

fn apply(product: &mut Product, data: ProductFormData) {
  product.title = data.title;
  product.price = data.price;
  product.description = data.description;
  product.category = data.category;
  product.image = data.image;
}

const NOT_FOUND: &str = "server responded with 404 Not Found";

impl CatalogApi for FakeApi {
  fn list_products(&self) -> ApiFuture<Vec<Product>> {
    self.respond("list_products", "fetch products", |s| {
      Ok(s.products.lock().unwrap().clone())
    })
  }

  fn get_product(&self, id: u64) -> ApiFuture<Product> {
    self.respond("get_product", "fetch product", |s| {
      s.products
        .lock()
        .unwrap()
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or_else(|| NOT_FOUND.to_string())
    })
  }

  fn list_categories(&self) -> ApiFuture<Vec<String>> {
    self.respond("list_categories", "fetch categories", |s| {
      Ok(s.categories.lock().unwrap().clone())
    })
  }

  fn create_product(&self, data: ProductFormData) -> ApiFuture<Product> {
    self.respond("create_product", "create product", |s| {
      let id = s.next_id.fetch_add(1, Ordering::SeqCst);
      let mut product = sample_product(id, "", 0.0, "");
      apply(&mut product, data);
      s.products.lock().unwrap().push(product.clone());
      Ok(product)
    })
  }

  fn update_product(&self, id: u64, data: ProductFormData) -> ApiFuture<Product> {
    self.respond("update_product", "update product", |s| {
      let mut products = s.products.lock().unwrap();
      let product = products
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| NOT_FOUND.to_string())?;
      apply(product, data);
      Ok(product.clone())
    })
  }

  fn delete_product(&self, id: u64) -> ApiFuture<Product> {
    self.respond("delete_product", "delete product", |s| {
      let mut products = s.products.lock().unwrap();
      let index = products
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| NOT_FOUND.to_string())?;
      Ok(products.remove(index))
    })
  }
}
