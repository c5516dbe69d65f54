//! Product catalog domain: remote API client, wire types, form validation and
//! the derived listing.

pub mod api_types;
pub mod client;
pub mod error;
pub mod form;
pub mod listing;
pub mod types;

pub use client::{CatalogApi, CatalogClient};
pub use error::ServiceError;
pub use types::{Product, ProductFormData};
