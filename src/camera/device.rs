//! 摄像头设备抽象
//!
//! 所有设备实现（真实硬件绑定 / 模拟器）实现 CameraDevice；CameraProvider 负责独占打开。
//! 任何调用都可能失败。对焦扫描结束时由设备调用一次性的 FocusCallback。

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::core::orchestrator::CameraEvent;
use crate::core::CameraError;
use crate::focus::CycleId;

/// 设备对焦模式（取值与 Camera.Parameters 的字符串一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    Auto,
    Macro,
    Fixed,
    Infinity,
    ContinuousPicture,
    ContinuousVideo,
}

impl FocusMode {
    /// 连续模式下设备自行对焦，不需要也不应再调用 autoFocus
    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::ContinuousPicture | Self::ContinuousVideo)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Macro => "macro",
            Self::Fixed => "fixed",
            Self::Infinity => "infinity",
            Self::ContinuousPicture => "continuous-picture",
            Self::ContinuousVideo => "continuous-video",
        }
    }
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对焦扫描完成回调：设备在扫描结束时调用一次 `complete`
///
/// 结果以消息形式投递回控制器任务，并携带发起扫描的周期 ID，过期结果由控制器丢弃。
#[derive(Debug)]
pub struct FocusCallback {
    cycle: CycleId,
    events: mpsc::UnboundedSender<CameraEvent>,
}

impl FocusCallback {
    pub(crate) fn new(cycle: CycleId, events: mpsc::UnboundedSender<CameraEvent>) -> Self {
        Self { cycle, events }
    }

    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    pub fn complete(self, success: bool) {
        if self
            .events
            .send(CameraEvent::FocusResult {
                cycle: self.cycle,
                success,
            })
            .is_err()
        {
            tracing::debug!("Focus result for {:?} dropped: controller stopped", self.cycle);
        }
    }
}

/// 已打开的摄像头句柄
pub trait CameraDevice: Send {
    fn focus_mode(&self) -> Result<FocusMode, CameraError>;

    fn set_focus_mode(&mut self, mode: FocusMode) -> Result<(), CameraError>;

    /// 预览画面的旋转角度（0 / 90 / 180 / 270）
    fn set_display_orientation(&mut self, degrees: u16) -> Result<(), CameraError>;

    fn start_preview(&mut self) -> Result<(), CameraError>;

    fn stop_preview(&mut self) -> Result<(), CameraError>;

    /// 开始一次对焦扫描；扫描结束时调用 callback。上一次扫描未结束时不得调用
    fn auto_focus(&mut self, callback: FocusCallback) -> Result<(), CameraError>;

    /// 取消进行中的扫描，被取消扫描的回调不会再触发
    fn cancel_auto_focus(&mut self) -> Result<(), CameraError>;

    /// 释放设备；之后任何调用都应返回 DeviceReleased
    fn release(&mut self);
}

/// 摄像头提供者：同一时刻最多打开一个设备
pub trait CameraProvider: Send {
    fn open(&mut self) -> Result<Box<dyn CameraDevice>, CameraError>;
}
