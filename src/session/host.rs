//! 宿主接口：权限、终止通知、标题栏状态
//!
//! 控制器只通过 CameraHost 与宿主交互；RecordingHost 记录所有调用，用于测试与无界面运行。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::core::FocusStatus;

/// 宿主应用（界面框架）提供的能力
pub trait CameraHost: Send + Sync {
    fn has_camera_permission(&self) -> bool;

    /// 发起权限请求，结果通过 PermissionCallback 回到控制器
    fn request_camera_permission(&self);

    /// 权限被拒绝：向用户显示 message 并结束功能
    fn permission_denied(&self, message: &str);

    /// 对焦状态变化，title 为带应用名前缀的标题文本
    fn status_changed(&self, status: FocusStatus, title: &str);
}

/// 宿主收到的调用
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    PermissionRequested,
    PermissionDenied(String),
    Status(FocusStatus, String),
}

/// 记录型宿主
#[derive(Debug, Default)]
pub struct RecordingHost {
    permission: AtomicBool,
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn new(permission_granted: bool) -> Self {
        Self {
            permission: AtomicBool::new(permission_granted),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.lock().clone()
    }

    pub fn statuses(&self) -> Vec<FocusStatus> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Status(status, _) => Some(*status),
                _ => None,
            })
            .collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Status(_, title) => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn permission_requests(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, HostEvent::PermissionRequested))
            .count()
    }

    pub fn denials(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, HostEvent::PermissionDenied(_)))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HostEvent>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn push(&self, event: HostEvent) {
        self.lock().push(event);
    }
}

impl CameraHost for RecordingHost {
    fn has_camera_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn request_camera_permission(&self) {
        self.push(HostEvent::PermissionRequested);
    }

    fn permission_denied(&self, message: &str) {
        self.push(HostEvent::PermissionDenied(message.to_string()));
    }

    fn status_changed(&self, status: FocusStatus, title: &str) {
        self.push(HostEvent::Status(status, title.to_string()));
    }
}
