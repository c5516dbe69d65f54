mod category_list;
mod product_detail;
mod product_form;
mod product_list;

pub use category_list::CategoryListView;
pub use product_detail::ProductDetailView;
pub use product_form::ProductFormView;
pub use product_list::ProductListView;
