//! TUI 宿主：把控制器对宿主的调用投影到 watch 通道里的 UiState

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::core::{FocusStatus, UiState};
use crate::session::CameraHost;

pub struct TuiHost {
    permission: AtomicBool,
    state_tx: watch::Sender<UiState>,
}

impl TuiHost {
    pub fn new(app_name: &str, permission_granted: bool) -> (Self, watch::Receiver<UiState>) {
        let (state_tx, state_rx) = watch::channel(UiState::new(app_name));
        (
            Self {
                permission: AtomicBool::new(permission_granted),
                state_tx,
            },
            state_rx,
        )
    }

    /// 用户回答了权限提示
    pub fn answer_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
        self.state_tx.send_modify(|s| s.permission_prompt = false);
    }
}

impl CameraHost for TuiHost {
    fn has_camera_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn request_camera_permission(&self) {
        self.state_tx.send_modify(|s| s.permission_prompt = true);
    }

    fn permission_denied(&self, message: &str) {
        self.state_tx.send_modify(|s| {
            s.permission_prompt = false;
            s.terminal_message = Some(message.to_string());
        });
    }

    fn status_changed(&self, status: FocusStatus, title: &str) {
        self.state_tx.send_modify(|s| {
            s.status = Some(status);
            s.title = title.to_string();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_updates_title() {
        let (host, rx) = TuiHost::new("AutoFocus", true);
        host.status_changed(FocusStatus::Focusing, "AutoFocus - focusing");
        assert_eq!(rx.borrow().title, "AutoFocus - focusing");
        assert_eq!(rx.borrow().status, Some(FocusStatus::Focusing));
    }

    #[test]
    fn test_permission_prompt_cleared_by_answer() {
        let (host, rx) = TuiHost::new("AutoFocus", false);
        host.request_camera_permission();
        assert!(rx.borrow().permission_prompt);
        host.answer_permission(true);
        assert!(!rx.borrow().permission_prompt);
        assert!(host.has_camera_permission());
    }
}
