pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{
  category_color, centered_overlay, format_price, input_line, top_left_overlay, truncate,
};
