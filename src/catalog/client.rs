use crate::catalog::api_types::{ApiProduct, ApiProductBody};
use crate::catalog::error::ServiceError;
use crate::catalog::types::{Product, ProductFormData};
use crate::config::ApiConfig;
use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Boxed future returned by [`CatalogApi`] operations
pub type ApiFuture<T> = BoxFuture<'static, Result<T, ServiceError>>;

/// The remote product service, as seen by the cache layer.
///
/// Futures are `'static` so the cache can spawn them and outlive the caller.
pub trait CatalogApi: Send + Sync {
  fn list_products(&self) -> ApiFuture<Vec<Product>>;
  fn get_product(&self, id: u64) -> ApiFuture<Product>;
  fn list_categories(&self) -> ApiFuture<Vec<String>>;
  fn create_product(&self, data: ProductFormData) -> ApiFuture<Product>;
  fn update_product(&self, id: u64, data: ProductFormData) -> ApiFuture<Product>;
  fn delete_product(&self, id: u64) -> ApiFuture<Product>;
}

/// HTTP client for the product service
#[derive(Clone)]
pub struct CatalogClient {
  http: reqwest::Client,
  base_url: Url,
}

impl CatalogClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let mut base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", config.base_url, e))?;

    // Url::join replaces the last path segment unless the base ends with '/'
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let mut builder =
      reqwest::Client::builder().user_agent(concat!("shelf/", env!("CARGO_PKG_VERSION")));
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }

    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn endpoint(&self, operation: &'static str, path: &str) -> Result<Url, ServiceError> {
    self
      .base_url
      .join(path)
      .map_err(|e| ServiceError::new(operation, format!("invalid URL: {}", e)))
  }

  /// Send a request and decode a successful JSON response
  async fn send<T: DeserializeOwned>(
    &self,
    operation: &'static str,
    request: reqwest::RequestBuilder,
  ) -> Result<T, ServiceError> {
    let response = request.send().await.map_err(|e| {
      warn!(operation, error = %e, "request failed");
      ServiceError::new(operation, e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
      warn!(operation, %status, "non-success response");
      return Err(ServiceError::status(operation, status));
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| ServiceError::new(operation, e.to_string()))?;

    serde_json::from_slice(&body).map_err(|e| {
      warn!(operation, error = %e, "unreadable response body");
      ServiceError::new(operation, format!("invalid response body: {}", e))
    })
  }

  /// List all products
  pub async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
    const OP: &str = "fetch products";
    let url = self.endpoint(OP, "products")?;
    debug!(%url, "GET");

    let products: Vec<ApiProduct> = self.send(OP, self.http.get(url)).await?;
    Ok(products.into_iter().map(Product::from).collect())
  }

  /// Get a single product by id
  pub async fn get_product(&self, id: u64) -> Result<Product, ServiceError> {
    const OP: &str = "fetch product";
    let url = self.endpoint(OP, &format!("products/{}", id))?;
    debug!(%url, "GET");

    let product: ApiProduct = self.send(OP, self.http.get(url)).await?;
    Ok(product.into())
  }

  /// List the category names known to the service
  pub async fn list_categories(&self) -> Result<Vec<String>, ServiceError> {
    const OP: &str = "fetch categories";
    let url = self.endpoint(OP, "products/categories")?;
    debug!(%url, "GET");

    self.send(OP, self.http.get(url)).await
  }

  /// Create a product; the service assigns the id
  pub async fn create_product(&self, data: &ProductFormData) -> Result<Product, ServiceError> {
    const OP: &str = "create product";
    let url = self.endpoint(OP, "products")?;
    debug!(%url, title = %data.title, "POST");

    let request = self.http.post(url).json(&ApiProductBody::new(data, None));
    let product: ApiProduct = self.send(OP, request).await?;
    Ok(product.into())
  }

  /// Replace a product's editable fields
  pub async fn update_product(
    &self,
    id: u64,
    data: &ProductFormData,
  ) -> Result<Product, ServiceError> {
    const OP: &str = "update product";
    let url = self.endpoint(OP, &format!("products/{}", id))?;
    debug!(%url, "PUT");

    let request = self.http.put(url).json(&ApiProductBody::new(data, Some(id)));
    let product: ApiProduct = self.send(OP, request).await?;
    Ok(product.into())
  }

  /// Delete a product, returning the deleted record
  pub async fn delete_product(&self, id: u64) -> Result<Product, ServiceError> {
    const OP: &str = "delete product";
    let url = self.endpoint(OP, &format!("products/{}", id))?;
    debug!(%url, "DELETE");

    let product: ApiProduct = self.send(OP, self.http.delete(url)).await?;
    Ok(product.into())
  }
}

impl CatalogApi for CatalogClient {
  fn list_products(&self) -> ApiFuture<Vec<Product>> {
    let client = self.clone();
    async move { client.list_products().await }.boxed()
  }

  fn get_product(&self, id: u64) -> ApiFuture<Product> {
    let client = self.clone();
    async move { client.get_product(id).await }.boxed()
  }

  fn list_categories(&self) -> ApiFuture<Vec<String>> {
    let client = self.clone();
    async move { client.list_categories().await }.boxed()
  }

  fn create_product(&self, data: ProductFormData) -> ApiFuture<Product> {
    let client = self.clone();
    async move { client.create_product(&data).await }.boxed()
  }

  fn update_product(&self, id: u64, data: ProductFormData) -> ApiFuture<Product> {
    let client = self.clone();
    async move { client.update_product(id, &data).await }.boxed()
  }

  fn delete_product(&self, id: u64) -> ApiFuture<Product> {
    let client = self.clone();
    async move { client.delete_product(id).await }.boxed()
  }
}
