/// A catalog product as returned by the remote service
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
  pub id: u64,
  pub title: String,
  pub price: f64,
  pub description: String,
  pub category: String,
  pub image: String,
  /// Only ever populated by the remote service
  pub rating: Option<Rating>,
}

/// Average review score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
  pub rate: f64,
  pub count: u64,
}

/// Editable subset of a product, sent on create and update
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFormData {
  pub title: String,
  pub price: f64,
  pub description: String,
  pub category: String,
  pub image: String,
}
