//! TUI 层：Ratatui + crossterm，主循环（app）、事件（event）、渲染（render）、宿主（host）

pub mod app;
pub mod event;
pub mod host;
pub mod render;

pub use app::run_app;
pub use event::{AppEvent, EventHandler};
pub use host::TuiHost;
pub use render::draw;
