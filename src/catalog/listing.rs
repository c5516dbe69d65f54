//! Derived product listing: search, category filter and price sort.
//!
//! The visible list is always recomputed from the fetched products and never
//! stored. It borrows from the source slice, which is left untouched.

use super::types::Product;
use std::collections::{BTreeMap, BTreeSet};

/// Price sort order, cycled by a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  /// Source order
  #[default]
  Unsorted,
  Ascending,
  Descending,
}

impl SortOrder {
  /// Next order in the cycle unsorted → ascending → descending → unsorted
  pub fn toggled(self) -> Self {
    match self {
      SortOrder::Unsorted => SortOrder::Ascending,
      SortOrder::Ascending => SortOrder::Descending,
      SortOrder::Descending => SortOrder::Unsorted,
    }
  }

  pub fn indicator(self) -> &'static str {
    match self {
      SortOrder::Unsorted => "",
      SortOrder::Ascending => "↑",
      SortOrder::Descending => "↓",
    }
  }
}

/// Current search text, selected categories and sort order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
  pub search: String,
  /// Empty means every category
  pub categories: BTreeSet<String>,
  pub sort: SortOrder,
}

impl ViewFilter {
  pub fn with_categories(categories: impl IntoIterator<Item = String>) -> Self {
    Self {
      categories: categories.into_iter().collect(),
      ..Self::default()
    }
  }

  /// Select the category, or deselect it if already selected
  pub fn toggle_category(&mut self, category: &str) {
    if !self.categories.remove(category) {
      self.categories.insert(category.to_string());
    }
  }

  pub fn clear_categories(&mut self) {
    self.categories.clear();
  }

  pub fn cycle_sort(&mut self) {
    self.sort = self.sort.toggled();
  }

  /// Whether a product passes the search and category filters
  pub fn matches(&self, product: &Product) -> bool {
    let matches_search = product
      .title
      .to_lowercase()
      .contains(&self.search.to_lowercase());
    let matches_category =
      self.categories.is_empty() || self.categories.contains(&product.category);
    matches_search && matches_category
  }

  /// Short description of the category selection for the filter bar
  pub fn categories_label(&self) -> String {
    match self.categories.len() {
      0 => "All categories".to_string(),
      1 => "1 category selected".to_string(),
      n => format!("{} categories selected", n),
    }
  }
}

/// Compute the visible, ordered products for the given filter.
///
/// Sorting is stable, so products with equal prices keep their filtered order.
pub fn derive_view<'a>(products: &'a [Product], filter: &ViewFilter) -> Vec<&'a Product> {
  let mut visible: Vec<&Product> = products.iter().filter(|p| filter.matches(p)).collect();

  match filter.sort {
    SortOrder::Unsorted => {}
    SortOrder::Ascending => visible.sort_by(|a, b| a.price.total_cmp(&b.price)),
    SortOrder::Descending => visible.sort_by(|a, b| b.price.total_cmp(&a.price)),
  }

  visible
}

/// Number of products per category
pub fn category_counts(products: &[Product]) -> BTreeMap<&str, usize> {
  let mut counts = BTreeMap::new();
  for product in products {
    *counts.entry(product.category.as_str()).or_insert(0) += 1;
  }
  counts
}

#[cfg(test)]
mod tests {
  use super::*;

  fn product(id: u64, title: &str, price: f64, category: &str) -> Product {
    Product {
      id,
      title: title.to_string(),
      price,
      description: String::new(),
      category: category.to_string(),
      image: String::new(),
      rating: None,
    }
  }

  fn shirt_and_mug() -> Vec<Product> {
    vec![
      product(1, "Shirt", 20.0, "clothes"),
      product(2, "Mug", 10.0, "home"),
    ]
  }

  fn catalog() -> Vec<Product> {
    vec![
      product(1, "Slim Fit Shirt", 22.3, "men's clothing"),
      product(2, "Rain Jacket", 39.99, "women's clothing"),
      product(3, "Gold Ring", 168.0, "jewelery"),
      product(4, "SSD 1TB", 109.0, "electronics"),
      product(5, "Cotton Shirt", 22.3, "men's clothing"),
      product(6, "Monitor", 599.0, "electronics"),
      product(7, "Silver Ring", 10.99, "jewelery"),
    ]
  }

  fn ids(products: &[&Product]) -> Vec<u64> {
    products.iter().map(|p| p.id).collect()
  }

  #[test]
  fn test_ascending_sort_scenario() {
    let products = shirt_and_mug();
    let filter = ViewFilter {
      sort: SortOrder::Ascending,
      ..ViewFilter::default()
    };

    assert_eq!(ids(&derive_view(&products, &filter)), vec![2, 1]);
  }

  #[test]
  fn test_case_insensitive_search_scenario() {
    let products = shirt_and_mug();
    let filter = ViewFilter {
      search: "shirt".to_string(),
      ..ViewFilter::default()
    };

    assert_eq!(ids(&derive_view(&products, &filter)), vec![1]);
  }

  #[test]
  fn test_search_keeps_source_order() {
    let products = catalog();
    for search in ["", "shirt", "RING", "t", "nothing matches"] {
      let filter = ViewFilter {
        search: search.to_string(),
        ..ViewFilter::default()
      };
      let expected: Vec<u64> = products
        .iter()
        .filter(|p| p.title.to_lowercase().contains(&search.to_lowercase()))
        .map(|p| p.id)
        .collect();

      assert_eq!(ids(&derive_view(&products, &filter)), expected, "search {:?}", search);
    }
  }

  #[test]
  fn test_category_filter_never_leaks() {
    let products = catalog();
    let filter = ViewFilter::with_categories(["jewelery".to_string(), "electronics".to_string()]);

    let visible = derive_view(&products, &filter);
    assert_eq!(ids(&visible), vec![3, 4, 6, 7]);
    assert!(visible.iter().all(|p| filter.categories.contains(&p.category)));
  }

  #[test]
  fn test_search_and_categories_combine() {
    let products = catalog();
    let mut filter = ViewFilter::with_categories(["jewelery".to_string()]);
    filter.search = "silver".to_string();

    assert_eq!(ids(&derive_view(&products, &filter)), vec![7]);
  }

  #[test]
  fn test_sort_is_stable_for_equal_prices() {
    let products = catalog();
    let mut filter = ViewFilter {
      sort: SortOrder::Ascending,
      ..ViewFilter::default()
    };
    assert_eq!(ids(&derive_view(&products, &filter)), vec![7, 1, 5, 2, 4, 3, 6]);

    filter.sort = SortOrder::Descending;
    assert_eq!(ids(&derive_view(&products, &filter)), vec![6, 3, 4, 2, 1, 5, 7]);
  }

  #[test]
  fn test_ascending_sort_is_idempotent() {
    let products = catalog();
    let filter = ViewFilter {
      sort: SortOrder::Ascending,
      ..ViewFilter::default()
    };

    let once: Vec<Product> = derive_view(&products, &filter)
      .into_iter()
      .cloned()
      .collect();
    let twice = derive_view(&once, &filter);
    assert_eq!(ids(&twice), once.iter().map(|p| p.id).collect::<Vec<_>>());
  }

  #[test]
  fn test_source_is_not_mutated() {
    let products = catalog();
    let before = products.clone();
    let filter = ViewFilter {
      search: "s".to_string(),
      sort: SortOrder::Descending,
      ..ViewFilter::default()
    };

    let _ = derive_view(&products, &filter);
    assert_eq!(products, before);
  }

  #[test]
  fn test_sort_cycle() {
    let start = SortOrder::Unsorted;
    assert_eq!(start.toggled(), SortOrder::Ascending);
    assert_eq!(start.toggled().toggled(), SortOrder::Descending);
    assert_eq!(start.toggled().toggled().toggled(), SortOrder::Unsorted);
  }

  #[test]
  fn test_toggle_and_clear_categories() {
    let mut filter = ViewFilter::default();
    filter.toggle_category("home");
    filter.toggle_category("clothes");
    assert_eq!(filter.categories_label(), "2 categories selected");

    filter.toggle_category("home");
    assert!(filter.categories.contains("clothes"));
    assert!(!filter.categories.contains("home"));
    assert_eq!(filter.categories_label(), "1 category selected");

    filter.clear_categories();
    assert!(filter.categories.is_empty());
    assert_eq!(filter.categories_label(), "All categories");
  }

  #[test]
  fn test_category_counts() {
    let products = catalog();
    let counts = category_counts(&products);
    assert_eq!(counts.get("electronics"), Some(&2));
    assert_eq!(counts.get("women's clothing"), Some(&1));
    assert_eq!(counts.len(), 4);
  }
}
