//! 错误恢复引擎
//!
//! 根据 CameraError 类型返回 RecoveryAction，供 FocusController / SessionController 决定是重试、
//! 结束对焦、中止会话、终止功能还是直接丢弃。

use crate::core::{CameraError, RecoveryAction};

/// 将错误映射为可执行动作（重试 / 取消对焦 / 中止会话 / 终止 / 丢弃）
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// 对焦相关调用（autoFocus / cancelAutoFocus）失败时的动作
    pub fn handle_focus(&self, err: &CameraError) -> RecoveryAction {
        match err {
            CameraError::DeviceBusy(_) => RecoveryAction::RetryFocus,
            CameraError::DeviceReleased | CameraError::DeviceUnavailable(_) => {
                RecoveryAction::CancelFocus
            }
            CameraError::StaleOperation(_) => RecoveryAction::Discard,
            CameraError::PermissionDenied => RecoveryAction::Terminate,
            _ => RecoveryAction::CancelFocus,
        }
    }

    /// 会话级调用（open / 配置 / 预览）失败时的动作
    pub fn handle_session(&self, err: &CameraError) -> RecoveryAction {
        match err {
            CameraError::PermissionDenied => RecoveryAction::Terminate,
            CameraError::StaleOperation(_) => RecoveryAction::Discard,
            _ => RecoveryAction::AbortSession,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_busy_retries_focus() {
        let engine = RecoveryEngine::new();
        let err = CameraError::DeviceBusy("autoFocus".to_string());
        assert_eq!(engine.handle_focus(&err), RecoveryAction::RetryFocus);
    }

    #[test]
    fn test_recovery_released_cancels_focus() {
        let engine = RecoveryEngine::new();
        assert_eq!(
            engine.handle_focus(&CameraError::DeviceReleased),
            RecoveryAction::CancelFocus
        );
    }

    #[test]
    fn test_recovery_stale_is_discarded() {
        let engine = RecoveryEngine::new();
        let err = CameraError::StaleOperation("retry for cycle 3".to_string());
        assert_eq!(engine.handle_focus(&err), RecoveryAction::Discard);
        assert_eq!(engine.handle_session(&err), RecoveryAction::Discard);
    }

    #[test]
    fn test_recovery_unavailable_aborts_session() {
        let engine = RecoveryEngine::new();
        let err = CameraError::DeviceUnavailable("open failed".to_string());
        assert_eq!(engine.handle_session(&err), RecoveryAction::AbortSession);
    }

    #[test]
    fn test_recovery_busy_during_open_aborts_session() {
        let engine = RecoveryEngine::new();
        let err = CameraError::DeviceBusy("startPreview".to_string());
        assert_eq!(engine.handle_session(&err), RecoveryAction::AbortSession);
    }

    #[test]
    fn test_recovery_permission_denied_terminates() {
        let engine = RecoveryEngine::new();
        assert_eq!(
            engine.handle_session(&CameraError::PermissionDenied),
            RecoveryAction::Terminate
        );
    }
}
