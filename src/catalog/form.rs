//! Product form draft and validation.
//!
//! A draft holds the raw text the user typed. Only a draft that validates is
//! turned into [`ProductFormData`] and sent to the service.

use super::types::{Product, ProductFormData};
use std::collections::BTreeMap;

/// Editable fields, in form order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
  Title,
  Price,
  Category,
  Description,
  Image,
}

impl FormField {
  pub const ALL: [FormField; 5] = [
    FormField::Title,
    FormField::Price,
    FormField::Category,
    FormField::Description,
    FormField::Image,
  ];

  pub fn label(self) -> &'static str {
    match self {
      FormField::Title => "Title",
      FormField::Price => "Price",
      FormField::Category => "Category",
      FormField::Description => "Description",
      FormField::Image => "Image URL",
    }
  }

  pub fn placeholder(self) -> &'static str {
    match self {
      FormField::Title => "Product name",
      FormField::Price => "0.00",
      FormField::Category => "Select a category",
      FormField::Description => "Product description",
      FormField::Image => "https://example.com/image.jpg",
    }
  }
}

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<FormField, &'static str>);

impl FormErrors {
  pub fn get(&self, field: FormField) -> Option<&'static str> {
    self.0.get(&field).copied()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  fn insert(&mut self, field: FormField, message: &'static str) {
    self.0.insert(field, message);
  }
}

/// Raw form input for creating or editing a product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
  pub title: String,
  pub price: String,
  pub description: String,
  pub category: String,
  pub image: String,
}

impl ProductDraft {
  /// Draft prefilled from an existing product
  pub fn from_product(product: &Product) -> Self {
    Self {
      title: product.title.clone(),
      price: product.price.to_string(),
      description: product.description.clone(),
      category: product.category.clone(),
      image: product.image.clone(),
    }
  }

  pub fn get(&self, field: FormField) -> &str {
    match field {
      FormField::Title => &self.title,
      FormField::Price => &self.price,
      FormField::Category => &self.category,
      FormField::Description => &self.description,
      FormField::Image => &self.image,
    }
  }

  pub fn set(&mut self, field: FormField, value: String) {
    match field {
      FormField::Title => self.title = value,
      FormField::Price => self.price = value,
      FormField::Category => self.category = value,
      FormField::Description => self.description = value,
      FormField::Image => self.image = value,
    }
  }

  /// Check every field, returning the data to submit or all field errors
  pub fn validate(&self) -> Result<ProductFormData, FormErrors> {
    let mut errors = FormErrors::default();

    if self.title.trim().is_empty() {
      errors.insert(FormField::Title, "Title is required");
    }

    let price = match self.price.trim() {
      "" => {
        errors.insert(FormField::Price, "Price is required");
        None
      }
      text => match text.parse::<f64>() {
        Ok(p) if p.is_finite() && p >= 0.0 => Some(p),
        Ok(p) if p.is_finite() => {
          errors.insert(FormField::Price, "Price must be 0 or greater");
          None
        }
        _ => {
          errors.insert(FormField::Price, "Price must be a number");
          None
        }
      },
    };

    if self.category.trim().is_empty() {
      errors.insert(FormField::Category, "Category is required");
    }
    if self.description.trim().is_empty() {
      errors.insert(FormField::Description, "Description is required");
    }
    if self.image.trim().is_empty() {
      errors.insert(FormField::Image, "Image URL is required");
    }

    match price {
      Some(price) if errors.is_empty() => Ok(ProductFormData {
        title: self.title.trim().to_string(),
        price,
        description: self.description.trim().to_string(),
        category: self.category.clone(),
        image: self.image.trim().to_string(),
      }),
      _ => Err(errors),
    }
  }
}
