pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{
  capitalize, format_count, global_index, humanize, page_window, stat_bar, truncate, type_color,
};
