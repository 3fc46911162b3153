//! 摄像头错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 CameraError 决定 RetryFocus / CancelFocus / AbortSession / Terminate / Discard。

use thiserror::Error;

/// 摄像头会话与对焦过程中可能出现的错误（设备、权限、过期回调、配置等）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// 打开或配置设备失败：放弃本次会话，不自动重试
    #[error("Camera device unavailable: {0}")]
    DeviceUnavailable(String),

    /// 预览/对焦期间的瞬时失败，按一次对焦失败处理
    #[error("Camera device busy: {0}")]
    DeviceBusy(String),

    /// 句柄已被释放（会话已拆除）
    #[error("Camera device already released")]
    DeviceReleased,

    #[error("Camera permission denied")]
    PermissionDenied,

    /// 失效后才到达的重试或回调，静默丢弃
    #[error("Stale operation discarded: {0}")]
    StaleOperation(String),

    #[error("Unsupported display rotation: {0}")]
    UnsupportedRotation(u16),

    #[error("Config error: {0}")]
    ConfigError(String),

    /// 控制器任务已退出，事件无法送达
    #[error("Camera controller stopped")]
    ControllerStopped,
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 记一次失败尝试，延时后重新触发对焦
    RetryFocus,
    /// 句柄失效：结束当前对焦周期，不再重试
    CancelFocus,
    /// 中止会话创建并释放已获取的设备
    AbortSession,
    /// 终止功能，由宿主结束界面
    Terminate,
    /// 丢弃（仅 debug 日志）
    Discard,
}
