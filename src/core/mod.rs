//! 核心编排层：错误与恢复、状态投影、重试调度、单写者主控循环、优雅关闭

pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod shutdown;
pub mod state;
pub mod task_scheduler;

pub use error::{CameraError, RecoveryAction};
pub use orchestrator::{spawn_camera_controller, CameraEvent, CameraHandle};
pub use recovery::RecoveryEngine;
pub use shutdown::{
    run_until_shutdown, CameraReleaseCleanup, ShutdownCleanup, ShutdownCoordinator,
    ShutdownManager, ShutdownReason,
};
pub use state::{
    ControllerSnapshot, FocusState, FocusStatus, PermissionState, StatusLine, UiState,
};
pub use task_scheduler::{RetryScheduler, RetryToken, TaskId};
