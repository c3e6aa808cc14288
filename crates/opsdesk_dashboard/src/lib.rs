mod filter;
mod render;
mod row;
mod view;

pub use filter::filter_files;
pub use render::{render_notifications, render_table};
pub use row::RowState;
pub use view::{Dashboard, DashboardSnapshot};
