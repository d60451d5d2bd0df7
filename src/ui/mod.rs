pub mod icons;
pub mod output;
pub mod table;

pub use icons::Icons;
pub use output::{error, header, info, is_quiet, section, success, summary_row, warn};
pub use table::{TableBuilder, import_table, order_table, stats_table};
