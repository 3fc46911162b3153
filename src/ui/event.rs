//! 事件处理
//!
//! 轮询 crossterm 键盘事件，模拟宿主的各个事件源：Enter/f 按键对焦、r 旋转、s 表面创建/销毁、
//! y/n 回答权限提示，q/Esc/Ctrl+C 退出。

use std::sync::Arc;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::camera::{PermissionCallback, Rotation, RotationCallback, SurfaceCallback};
use crate::core::CameraHandle;
use crate::ui::host::TuiHost;

/// 应用事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// 已转发给控制器
    Forwarded,
    Quit,
    Ignored,
}

/// 事件处理器：持有控制器句柄与模拟的旋转 / 表面状态
pub struct EventHandler {
    handle: CameraHandle,
    host: Arc<TuiHost>,
    rotation: Rotation,
    surface_attached: bool,
}

impl EventHandler {
    pub fn new(handle: CameraHandle, host: Arc<TuiHost>) -> Self {
        Self {
            handle,
            host,
            rotation: Rotation::default(),
            surface_attached: false,
        }
    }

    /// 视图挂载：表面创建
    pub fn attach_surface(&mut self) {
        self.surface_attached = true;
        self.handle.surface_created();
    }

    pub fn poll(&mut self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(self.handle_key(key)));
                }
            }
        }
        Ok(None)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppEvent {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => AppEvent::Quit,
            KeyCode::Char('q') | KeyCode::Esc => AppEvent::Quit,
            KeyCode::Enter | KeyCode::Char('f') => {
                if let Err(e) = self.handle.request_focus() {
                    tracing::warn!("Focus request dropped: {}", e);
                }
                AppEvent::Forwarded
            }
            KeyCode::Char('r') => {
                self.rotation = self.rotation.flipped();
                self.handle.on_rotation_changed(self.rotation);
                AppEvent::Forwarded
            }
            KeyCode::Char('s') => {
                if self.surface_attached {
                    self.handle.surface_destroyed();
                } else {
                    self.handle.surface_created();
                }
                self.surface_attached = !self.surface_attached;
                AppEvent::Forwarded
            }
            KeyCode::Char(c @ ('y' | 'n')) => {
                let granted = c == 'y';
                self.host.answer_permission(granted);
                self.handle.on_permission_result(granted);
                AppEvent::Forwarded
            }
            _ => AppEvent::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::SimulatedCameraProvider;
    use crate::session::host::CameraHost;
    use crate::config::AppConfig;
    use crate::core::spawn_camera_controller;
    use tokio_util::sync::CancellationToken;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn handler(granted: bool) -> (EventHandler, CameraHandle, Arc<TuiHost>) {
        let (host, _rx) = TuiHost::new("AutoFocus", granted);
        let host = Arc::new(host);
        let (handle, _task) = spawn_camera_controller(
            &AppConfig::default(),
            Box::new(SimulatedCameraProvider::new()),
            host.clone(),
            CancellationToken::new(),
        )
        .unwrap();
        (EventHandler::new(handle.clone(), host.clone()), handle, host)
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (mut events, _handle, _host) = handler(true).await;
        assert_eq!(events.handle_key(key(KeyCode::Char('q'))), AppEvent::Quit);
        assert_eq!(events.handle_key(key(KeyCode::Esc)), AppEvent::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(events.handle_key(ctrl_c), AppEvent::Quit);
        assert_eq!(events.handle_key(key(KeyCode::Char('x'))), AppEvent::Ignored);
    }

    #[tokio::test]
    async fn test_rotate_and_surface_keys_reach_controller() {
        let (mut events, handle, _host) = handler(true).await;
        events.handle_key(key(KeyCode::Char('r')));
        events.handle_key(key(KeyCode::Char('s')));

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.rotation_degrees, 180);
        assert!(snap.surface_ready);
        assert!(snap.session_open);
        assert_eq!(snap.orientation_degrees, Some(0));

        events.handle_key(key(KeyCode::Char('s')));
        let snap = handle.snapshot().await.unwrap();
        assert!(!snap.surface_ready);
        assert!(!snap.session_open);
    }

    #[tokio::test]
    async fn test_permission_answer_opens_camera() {
        let (mut events, handle, host) = handler(false).await;
        events.attach_surface();
        let snap = handle.snapshot().await.unwrap();
        assert!(!snap.session_open);

        assert_eq!(events.handle_key(key(KeyCode::Char('y'))), AppEvent::Forwarded);
        assert!(host.has_camera_permission());
        let snap = handle.snapshot().await.unwrap();
        assert!(snap.session_open);
    }
}
