//! 状态定义：对焦状态文本、控制器快照与 UiState 投影
//!
//! 宿主只看到两种状态文本（focusing / locked），由 StatusLine 加上应用名前缀组成标题；
//! 控制器内部状态通过 ControllerSnapshot 投影给 UI 与测试。

use serde::Serialize;

use crate::config::AppConfig;

/// 宿主可见的对焦状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FocusStatus {
    Focusing,
    Locked,
}

/// 对焦周期状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum FocusState {
    #[default]
    Idle,
    Focusing,
}

/// 摄像头权限状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum PermissionState {
    /// 尚未检查
    #[default]
    Unknown,
    /// 已向宿主发起请求，等待结果
    Requested,
    Granted,
    /// 终态
    Denied,
}

/// 标题栏文本：`<应用名> - <状态>`
#[derive(Clone, Debug)]
pub struct StatusLine {
    app_name: String,
    focusing: String,
    locked: String,
}

impl StatusLine {
    pub fn new(
        app_name: impl Into<String>,
        focusing: impl Into<String>,
        locked: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            focusing: focusing.into(),
            locked: locked.into(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.app.name.clone(),
            cfg.status.focusing.clone(),
            cfg.status.locked.clone(),
        )
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn title(&self, status: FocusStatus) -> String {
        let label = match status {
            FocusStatus::Focusing => &self.focusing,
            FocusStatus::Locked => &self.locked,
        };
        format!("{} - {}", self.app_name, label)
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new("AutoFocus", "focusing", "locked")
    }
}

/// 控制器内部状态快照
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ControllerSnapshot {
    pub session_open: bool,
    pub preview_active: bool,
    pub orientation_degrees: Option<u16>,
    pub rotation_degrees: u16,
    pub surface_ready: bool,
    pub focus_state: FocusState,
    pub attempt_count: u32,
    pub retry_pending: bool,
    pub permission: PermissionState,
}

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub title: String,
    pub status: Option<FocusStatus>,
    pub snapshot: ControllerSnapshot,
    /// 宿主需要向用户询问摄像头权限
    pub permission_prompt: bool,
    /// 终止信息（权限被拒绝）；非空时 UI 应结束
    pub terminal_message: Option<String>,
}

impl UiState {
    pub fn new(app_name: &str) -> Self {
        Self {
            title: app_name.to_string(),
            status: None,
            snapshot: ControllerSnapshot::default(),
            permission_prompt: false,
            terminal_message: None,
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new(StatusLine::default().app_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_has_app_prefix() {
        let line = StatusLine::new("AutoFocus", "focusing", "locked");
        assert_eq!(line.title(FocusStatus::Focusing), "AutoFocus - focusing");
        assert_eq!(line.title(FocusStatus::Locked), "AutoFocus - locked");
    }

    #[test]
    fn test_status_line_from_config_labels() {
        let mut cfg = AppConfig::default();
        cfg.app.name = "Cam".to_string();
        cfg.status.locked = "LOCK".to_string();
        let line = StatusLine::from_config(&cfg);
        assert_eq!(line.title(FocusStatus::Locked), "Cam - LOCK");
    }

    #[test]
    fn test_default_snapshot_is_closed_and_idle() {
        let snap = ControllerSnapshot::default();
        assert!(!snap.session_open);
        assert!(!snap.preview_active);
        assert_eq!(snap.focus_state, FocusState::Idle);
        assert_eq!(snap.permission, PermissionState::Unknown);
    }
}
