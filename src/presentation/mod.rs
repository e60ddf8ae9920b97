pub mod dashboard;
pub mod format;
pub mod text;
pub mod theme;
pub mod view_model;

pub use dashboard::Dashboard;
pub use text::{render_snapshot, Header};
