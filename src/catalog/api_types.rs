//! Serde types matching the product service's JSON.
//!
//! Kept apart from the domain types so the wire format can be lenient
//! (missing fields, prices sent back as strings) without leaking into the app.

use super::types::{Product, ProductFormData, Rating};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Deserialize)]
pub struct ApiRating {
  #[serde(default)]
  pub rate: f64,
  #[serde(default)]
  pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApiProduct {
  pub id: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default, deserialize_with = "deserialize_price")]
  pub price: f64,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub image: String,
  pub rating: Option<ApiRating>,
}

impl From<ApiProduct> for Product {
  fn from(api: ApiProduct) -> Self {
    Product {
      id: api.id,
      title: api.title,
      price: api.price,
      description: api.description,
      category: api.category,
      image: api.image,
      rating: api.rating.map(|r| Rating {
        rate: r.rate,
        count: r.count,
      }),
    }
  }
}

/// Request body for create (no id) and update (id echoed back)
#[derive(Debug, Serialize)]
pub struct ApiProductBody<'a> {
  pub title: &'a str,
  pub price: f64,
  pub description: &'a str,
  pub category: &'a str,
  pub image: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<u64>,
}

impl<'a> ApiProductBody<'a> {
  pub fn new(data: &'a ProductFormData, id: Option<u64>) -> Self {
    Self {
      title: &data.title,
      price: data.price,
      description: &data.description,
      category: &data.category,
      image: &data.image,
      id,
    }
  }
}

/// The service echoes back whatever was posted, so a price may come back as a string
fn deserialize_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Price {
    Number(f64),
    Text(String),
  }

  match Price::deserialize(deserializer)? {
    Price::Number(n) => Ok(n),
    Price::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parses_full_product() {
    let api: ApiProduct = serde_json::from_value(json!({
      "id": 1,
      "title": "Fjallraven Backpack",
      "price": 109.95,
      "description": "Your perfect pack",
      "category": "men's clothing",
      "image": "https://fakestoreapi.com/img/81fPKd-2AYL._AC_SL1500_.jpg",
      "rating": { "rate": 3.9, "count": 120 }
    }))
    .unwrap();

    let product = Product::from(api);
    assert_eq!(product.id, 1);
    assert_eq!(product.price, 109.95);
    assert_eq!(
      product.rating,
      Some(Rating {
        rate: 3.9,
        count: 120
      })
    );
  }

  #[test]
  fn test_price_as_string_and_missing_rating() {
    let api: ApiProduct = serde_json::from_value(json!({
      "id": 21,
      "title": "Mug",
      "price": "13.5",
      "description": "",
      "category": "home",
      "image": "https://example.com/mug.png"
    }))
    .unwrap();

    let product = Product::from(api);
    assert_eq!(product.price, 13.5);
    assert!(product.rating.is_none());
  }

  #[test]
  fn test_update_body_includes_id() {
    let data = ProductFormData {
      title: "Mug".to_string(),
      price: 10.0,
      description: "A mug".to_string(),
      category: "home".to_string(),
      image: "https://example.com/mug.png".to_string(),
    };

    let create = serde_json::to_value(ApiProductBody::new(&data, None)).unwrap();
    assert!(create.get("id").is_none());

    let update = serde_json::to_value(ApiProductBody::new(&data, Some(7))).unwrap();
    assert_eq!(update["id"], 7);
    assert_eq!(update["title"], "Mug");
  }
}
