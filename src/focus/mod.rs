//! 按键对焦：对焦周期与重试状态机

pub mod controller;
pub mod cycle;

pub use controller::FocusController;
pub use cycle::{CycleId, FocusCycle};
