//! 会话控制器：摄像头独占获取/释放、预览启停、权限与旋转
//!
//! 表面可用 → 检查权限 → 打开设备 → 设置单次对焦模式 → 施加预览方向 → 开始预览 → 触发一次对焦；
//! 表面销毁 → 作废对焦周期 → 停止预览 → 释放设备。拆除总会完成，设备错误只记录。

use std::sync::Arc;

use crate::camera::{CameraProvider, FocusMode, Rotation};
use crate::config::AppConfig;
use crate::core::{
    CameraError, ControllerSnapshot, PermissionState, RecoveryAction, RecoveryEngine,
};
use crate::focus::{CycleId, FocusController};
use crate::session::{CameraHost, CameraSession};

pub struct SessionController {
    provider: Box<dyn CameraProvider>,
    host: Arc<dyn CameraHost>,
    recovery: RecoveryEngine,
    focus: FocusController,
    session: Option<CameraSession>,
    focus_mode: FocusMode,
    rotation: Rotation,
    permission: PermissionState,
    surface_ready: bool,
    denied_message: String,
    denied_reported: bool,
}

impl SessionController {
    pub fn new(
        cfg: &AppConfig,
        provider: Box<dyn CameraProvider>,
        host: Arc<dyn CameraHost>,
        focus: FocusController,
    ) -> Self {
        Self {
            provider,
            host,
            recovery: RecoveryEngine::new(),
            focus,
            session: None,
            focus_mode: cfg.focus.mode,
            rotation: Rotation::default(),
            permission: PermissionState::Unknown,
            surface_ready: false,
            denied_message: cfg.status.permission_denied.clone(),
            denied_reported: false,
        }
    }

    pub fn session(&self) -> Option<&CameraSession> {
        self.session.as_ref()
    }

    pub fn focus(&self) -> &FocusController {
        &self.focus
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            session_open: self.session.is_some(),
            preview_active: self.session.as_ref().is_some_and(|s| s.preview_active()),
            orientation_degrees: self.session.as_ref().and_then(|s| s.orientation_degrees()),
            rotation_degrees: self.rotation.degrees(),
            surface_ready: self.surface_ready,
            focus_state: self.focus.state(),
            attempt_count: self.focus.attempt_count(),
            retry_pending: self.focus.retry_pending(),
            permission: self.permission,
        }
    }

    pub fn on_surface_available(&mut self) {
        tracing::debug!("Surface created");
        self.surface_ready = true;
        if self.session.is_some() {
            tracing::debug!("Camera already open, nothing to do");
            return;
        }
        if self.ensure_permission() {
            self.start();
        }
    }

    pub fn on_surface_changed(&mut self, format: i32, width: u32, height: u32) {
        tracing::debug!(format, width, height, "Surface changed");
    }

    pub fn on_surface_destroyed(&mut self) {
        tracing::debug!("Surface destroyed");
        self.surface_ready = false;
        self.teardown();
    }

    pub fn on_rotation_changed(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        let degrees = rotation.display_orientation();
        match self.session.as_mut() {
            Some(session) => {
                tracing::debug!(
                    rotation = rotation.degrees(),
                    degrees,
                    "Updating display orientation"
                );
                if let Err(e) = session.apply_orientation(degrees) {
                    tracing::warn!(session = %session.id(), "setDisplayOrientation failed: {}", e);
                }
            }
            None => {
                tracing::debug!(
                    rotation = rotation.degrees(),
                    "Rotation changed with no open camera"
                );
            }
        }
    }

    pub fn on_permission_result(&mut self, granted: bool) {
        if !granted {
            self.permission = PermissionState::Denied;
            self.teardown();
            self.report_permission_denied();
            return;
        }

        if self.permission == PermissionState::Denied {
            tracing::debug!("Permission already denied, later grant ignored");
            return;
        }

        tracing::info!("Permission granted");
        self.permission = PermissionState::Granted;
        if self.surface_ready && self.session.is_none() {
            self.start();
        } else {
            tracing::debug!("Waiting for surface before opening camera");
        }
    }

    /// 用户按键对焦；没有会话但表面已就绪时先打开设备（打开后自带一次对焦）
    pub fn request_focus(&mut self) {
        if self.session.is_none() {
            if self.surface_ready && self.ensure_permission() {
                self.start();
            } else {
                tracing::debug!("No camera session, focus request ignored");
            }
            return;
        }
        self.focus.request_focus(self.session.as_mut());
    }

    pub fn on_focus_result(&mut self, cycle: CycleId, success: bool) -> Result<(), CameraError> {
        self.focus.on_focus_result(cycle, success)
    }

    pub fn on_retry_due(&mut self, cycle: CycleId) -> Result<(), CameraError> {
        self.focus.on_retry_due(cycle, self.session.as_mut())
    }

    /// 结束会话（进程退出时调用），与表面销毁相同但保留表面状态
    pub fn close(&mut self) {
        self.teardown();
    }

    fn ensure_permission(&mut self) -> bool {
        match self.permission {
            PermissionState::Granted => true,
            PermissionState::Denied => {
                tracing::debug!("Camera permission was denied, not opening");
                false
            }
            PermissionState::Unknown | PermissionState::Requested => {
                if self.host.has_camera_permission() {
                    self.permission = PermissionState::Granted;
                    return true;
                }
                if self.permission == PermissionState::Unknown {
                    tracing::info!("Requesting camera permission");
                    self.permission = PermissionState::Requested;
                    self.host.request_camera_permission();
                } else {
                    tracing::debug!("Camera permission request still pending");
                }
                false
            }
        }
    }

    fn start(&mut self) {
        if let Err(e) = self.open_session() {
            match self.recovery.handle_session(&e) {
                RecoveryAction::Terminate => {
                    self.permission = PermissionState::Denied;
                    self.report_permission_denied();
                }
                RecoveryAction::Discard => tracing::debug!("Session open discarded: {}", e),
                _ => tracing::error!("Failed to open camera session: {}", e),
            }
        }
    }

    fn open_session(&mut self) -> Result<(), CameraError> {
        tracing::debug!("Opening camera");
        let device = self.provider.open()?;
        let mut session = CameraSession::new(device);

        if let Err(e) = self.configure(&mut session) {
            session.close();
            return Err(e);
        }

        tracing::info!(
            session = %session.id(),
            orientation = ?session.orientation_degrees(),
            "Camera preview started"
        );
        self.session = Some(session);
        self.focus.request_focus(self.session.as_mut());
        Ok(())
    }

    fn configure(&self, session: &mut CameraSession) -> Result<(), CameraError> {
        let current = session.device().focus_mode()?;
        if current != self.focus_mode {
            tracing::debug!("Changing focus from {} to {}", current, self.focus_mode);
            session.device_mut().set_focus_mode(self.focus_mode)?;
        }
        session.apply_orientation(self.rotation.display_orientation())?;
        session.start_preview()
    }

    fn teardown(&mut self) {
        self.focus.cancel();
        if let Some(session) = self.session.take() {
            tracing::debug!(session = %session.id(), "Stop preview");
            session.close();
        }
    }

    fn report_permission_denied(&mut self) {
        if self.denied_reported {
            return;
        }
        self.denied_reported = true;
        tracing::info!("Permission denied. Exiting");
        self.host.permission_denied(&self.denied_message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{DeviceCall, SimulatedCameraProvider, SimulatorProbe};
    use crate::core::orchestrator::CameraEvent;
    use crate::core::task_scheduler::RetryScheduler;
    use crate::core::FocusState;
    use crate::session::RecordingHost;
    use tokio::sync::mpsc;

    struct Fixture {
        ctl: SessionController,
        probe: SimulatorProbe,
        host: Arc<RecordingHost>,
        _tx: mpsc::UnboundedSender<CameraEvent>,
    }

    fn fixture(provider: SimulatedCameraProvider, granted: bool) -> Fixture {
        let cfg = AppConfig::default();
        let probe = provider.probe();
        let host = Arc::new(RecordingHost::new(granted));
        let (tx, _rx) = mpsc::unbounded_channel();
        let focus = FocusController::new(&cfg, RetryScheduler::default(), &tx, host.clone());
        let ctl = SessionController::new(&cfg, Box::new(provider), host.clone(), focus);
        Fixture {
            ctl,
            probe,
            host,
            _tx: tx,
        }
    }

    #[tokio::test]
    async fn test_surface_available_opens_and_focuses() {
        let Fixture {
            mut ctl,
            probe,
            host: _host,
            ..
        } = fixture(SimulatedCameraProvider::new(), true);
        ctl.on_surface_available();

        let snap = ctl.snapshot();
        assert!(snap.session_open);
        assert!(snap.preview_active);
        assert_eq!(snap.orientation_degrees, Some(180));
        assert_eq!(probe.focus_mode(), FocusMode::Auto);
        assert_eq!(probe.count(DeviceCall::AutoFocus), 1);
    }

    #[tokio::test]
    async fn test_focus_mode_not_rewritten_when_already_set() {
        let provider = SimulatedCameraProvider::new().with_initial_focus_mode(FocusMode::Auto);
        let Fixture {
            mut ctl,
            probe,
            host: _host,
            ..
        } = fixture(provider, true);
        ctl.on_surface_available();
        assert_eq!(probe.count(DeviceCall::SetFocusMode(FocusMode::Auto)), 0);
    }

    #[tokio::test]
    async fn test_open_failure_is_not_retried() {
        let provider = SimulatedCameraProvider::new().failing_open();
        let Fixture {
            mut ctl,
            probe,
            host,
            ..
        } = fixture(provider, true);
        ctl.on_surface_available();

        assert!(!ctl.snapshot().session_open);
        assert_eq!(probe.count(DeviceCall::Open), 1);
        assert!(host.statuses().is_empty());
    }

    #[tokio::test]
    async fn test_preview_failure_releases_device() {
        let provider = SimulatedCameraProvider::new().failing_preview();
        let Fixture {
            mut ctl,
            probe,
            host: _host,
            ..
        } = fixture(provider, true);
        ctl.on_surface_available();

        assert!(ctl.session().is_none());
        assert!(!probe.is_open());
        assert_eq!(probe.count(DeviceCall::Release), 1);
        assert_eq!(probe.count(DeviceCall::AutoFocus), 0);
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let Fixture {
            mut ctl,
            probe,
            host: _host,
            ..
        } = fixture(SimulatedCameraProvider::new(), true);
        ctl.on_surface_destroyed();
        ctl.on_surface_available();
        ctl.on_surface_destroyed();
        ctl.on_surface_destroyed();

        let snap = ctl.snapshot();
        assert!(!snap.session_open);
        assert_eq!(snap.focus_state, FocusState::Idle);
        assert_eq!(probe.count(DeviceCall::Release), 1);
        assert_eq!(probe.count(DeviceCall::StopPreview), 1);
    }

    #[tokio::test]
    async fn test_rotation_without_session_is_noop() {
        let Fixture {
            mut ctl,
            probe,
            host: _host,
            ..
        } = fixture(SimulatedCameraProvider::new(), true);
        ctl.on_rotation_changed(Rotation::Rotation180);
        assert!(probe.calls().is_empty());
        assert_eq!(ctl.snapshot().rotation_degrees, 180);
    }

    #[tokio::test]
    async fn test_rotation_applied_to_open_session() {
        let Fixture {
            mut ctl,
            probe,
            host: _host,
            ..
        } = fixture(SimulatedCameraProvider::new(), true);
        ctl.on_surface_available();
        ctl.on_rotation_changed(Rotation::Rotation180);
        assert_eq!(ctl.snapshot().orientation_degrees, Some(0));
        ctl.on_rotation_changed(Rotation::Rotation0);
        assert_eq!(ctl.snapshot().orientation_degrees, Some(180));
        assert_eq!(probe.count(DeviceCall::SetDisplayOrientation(180)), 2);
    }

    #[tokio::test]
    async fn test_permission_requested_once_then_granted() {
        let Fixture {
            mut ctl,
            probe,
            host,
            ..
        } = fixture(SimulatedCameraProvider::new(), false);
        ctl.on_surface_available();
        ctl.on_surface_available();
        assert_eq!(host.permission_requests(), 1);
        assert!(probe.calls().is_empty());

        ctl.on_permission_result(true);
        assert!(ctl.snapshot().session_open);
        assert_eq!(ctl.snapshot().permission, PermissionState::Granted);
    }

    #[tokio::test]
    async fn test_permission_denied_reported_once() {
        let Fixture {
            mut ctl,
            probe,
            host,
            ..
        } = fixture(SimulatedCameraProvider::new(), false);
        ctl.on_surface_available();
        ctl.on_permission_result(false);
        ctl.on_permission_result(false);
        ctl.on_surface_available();

        assert_eq!(host.denials(), 1);
        assert!(!ctl.snapshot().session_open);
        assert_eq!(probe.count(DeviceCall::Open), 0);
    }

    #[tokio::test]
    async fn test_grant_after_denial_is_ignored() {
        let Fixture {
            mut ctl,
            probe,
            host,
            ..
        } = fixture(SimulatedCameraProvider::new(), false);
        ctl.on_surface_available();
        ctl.on_permission_result(false);
        host.set_permission(true);
        ctl.on_permission_result(true);
        ctl.request_focus();

        let snap = ctl.snapshot();
        assert_eq!(snap.permission, PermissionState::Denied);
        assert!(!snap.session_open);
        assert_eq!(host.denials(), 1);
        assert_eq!(probe.count(DeviceCall::Open), 0);
    }

    #[tokio::test]
    async fn test_stop_preview_failure_still_releases() {
        let provider = SimulatedCameraProvider::new().failing_stop_preview();
        let Fixture {
            mut ctl,
            probe,
            host: _host,
            ..
        } = fixture(provider, true);
        ctl.on_surface_available();
        assert!(probe.is_previewing());

        ctl.on_surface_destroyed();

        let snap = ctl.snapshot();
        assert!(!snap.session_open);
        assert_eq!(snap.focus_state, FocusState::Idle);
        assert_eq!(probe.count(DeviceCall::StopPreview), 1);
        assert_eq!(probe.count(DeviceCall::Release), 1);
        assert!(!probe.is_open());
    }

    #[tokio::test]
    async fn test_focus_request_reopens_when_surface_ready() {
        let provider = SimulatedCameraProvider::new().failing_preview();
        let Fixture {
            mut ctl,
            probe,
            host: _host,
            ..
        } = fixture(provider, true);
        ctl.on_surface_available();
        ctl.request_focus();
        assert_eq!(probe.count(DeviceCall::Open), 2);
    }
}
