//! 摄像头控制器编排：单写者主控循环
//!
//! 所有外部事件（表面、旋转、权限、按键）、设备对焦回调与重试到期都作为 CameraEvent 进入同一个通道，
//! 由后台任务逐条处理；会话与对焦状态只在这个任务里被修改。

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::camera::{
    CameraProvider, PermissionCallback, PreviewFrameCallback, Rotation, RotationCallback,
    SurfaceCallback,
};
use crate::config::AppConfig;
use crate::core::task_scheduler::RetryScheduler;
use crate::core::{CameraError, ControllerSnapshot, RecoveryAction, RecoveryEngine};
use crate::focus::{CycleId, FocusController};
use crate::session::{CameraHost, SessionController};

/// 进入控制器任务的事件
#[derive(Debug)]
pub enum CameraEvent {
    SurfaceCreated,
    SurfaceChanged { format: i32, width: u32, height: u32 },
    SurfaceDestroyed,
    RotationChanged(Rotation),
    PermissionResult { granted: bool },
    /// 用户按键对焦（确认键 / 触控板双击）
    RequestFocus,
    /// 设备对焦扫描结束
    FocusResult { cycle: CycleId, success: bool },
    /// 重试延时到期
    RetryDue { cycle: CycleId },
    Snapshot(oneshot::Sender<ControllerSnapshot>),
    /// 拆除会话并退出循环，完成后回复
    Shutdown(oneshot::Sender<()>),
}

/// 控制器句柄：可克隆，实现所有宿主侧回调能力
#[derive(Clone, Debug)]
pub struct CameraHandle {
    tx: mpsc::UnboundedSender<CameraEvent>,
}

impl CameraHandle {
    pub fn send(&self, event: CameraEvent) -> Result<(), CameraError> {
        self.tx
            .send(event)
            .map_err(|_| CameraError::ControllerStopped)
    }

    pub fn request_focus(&self) -> Result<(), CameraError> {
        self.send(CameraEvent::RequestFocus)
    }

    pub async fn snapshot(&self) -> Result<ControllerSnapshot, CameraError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CameraEvent::Snapshot(reply_tx))?;
        reply_rx.await.map_err(|_| CameraError::ControllerStopped)
    }

    /// 释放摄像头并停止控制器任务
    pub async fn shutdown(&self) -> Result<(), CameraError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(CameraEvent::Shutdown(ack_tx))?;
        ack_rx.await.map_err(|_| CameraError::ControllerStopped)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn notify(&self, event: CameraEvent) {
        if let Err(e) = self.send(event) {
            tracing::debug!("Camera event dropped: {}", e);
        }
    }
}

impl SurfaceCallback for CameraHandle {
    fn surface_created(&self) {
        self.notify(CameraEvent::SurfaceCreated);
    }

    fn surface_changed(&self, format: i32, width: u32, height: u32) {
        self.notify(CameraEvent::SurfaceChanged {
            format,
            width,
            height,
        });
    }

    fn surface_destroyed(&self) {
        self.notify(CameraEvent::SurfaceDestroyed);
    }
}

impl RotationCallback for CameraHandle {
    fn on_rotation_changed(&self, rotation: Rotation) {
        self.notify(CameraEvent::RotationChanged(rotation));
    }
}

impl PermissionCallback for CameraHandle {
    fn on_permission_result(&self, granted: bool) {
        self.notify(CameraEvent::PermissionResult { granted });
    }
}

impl PreviewFrameCallback for CameraHandle {
    fn on_preview_frame(&self, data: &[u8]) {
        tracing::trace!(bytes = data.len(), "Preview frame");
    }
}

/// 创建控制器任务：返回句柄与任务 JoinHandle。shutdown 取消时所有未到期的重试作废。
///
/// 必须在 tokio 运行时内调用。
pub fn spawn_camera_controller(
    cfg: &AppConfig,
    provider: Box<dyn CameraProvider>,
    host: Arc<dyn CameraHost>,
    shutdown: CancellationToken,
) -> Result<(CameraHandle, JoinHandle<()>), CameraError> {
    cfg.validate()?;

    let (tx, rx) = mpsc::unbounded_channel::<CameraEvent>();
    let scheduler = RetryScheduler::new(shutdown);
    let focus = FocusController::new(cfg, scheduler, &tx, host.clone());
    let controller = SessionController::new(cfg, provider, host, focus);

    let task = tokio::spawn(run_controller(controller, rx));
    Ok((CameraHandle { tx }, task))
}

async fn run_controller(
    mut controller: SessionController,
    mut rx: mpsc::UnboundedReceiver<CameraEvent>,
) {
    let recovery = RecoveryEngine::new();

    while let Some(event) = rx.recv().await {
        let outcome = match event {
            CameraEvent::SurfaceCreated => {
                controller.on_surface_available();
                Ok(())
            }
            CameraEvent::SurfaceChanged {
                format,
                width,
                height,
            } => {
                controller.on_surface_changed(format, width, height);
                Ok(())
            }
            CameraEvent::SurfaceDestroyed => {
                controller.on_surface_destroyed();
                Ok(())
            }
            CameraEvent::RotationChanged(rotation) => {
                controller.on_rotation_changed(rotation);
                Ok(())
            }
            CameraEvent::PermissionResult { granted } => {
                controller.on_permission_result(granted);
                Ok(())
            }
            CameraEvent::RequestFocus => {
                controller.request_focus();
                Ok(())
            }
            CameraEvent::FocusResult { cycle, success } => {
                controller.on_focus_result(cycle, success)
            }
            CameraEvent::RetryDue { cycle } => controller.on_retry_due(cycle),
            CameraEvent::Snapshot(reply) => {
                let _ = reply.send(controller.snapshot());
                Ok(())
            }
            CameraEvent::Shutdown(ack) => {
                controller.close();
                let _ = ack.send(());
                break;
            }
        };

        if let Err(e) = outcome {
            match recovery.handle_focus(&e) {
                RecoveryAction::Discard => tracing::debug!("{}", e),
                _ => tracing::warn!("Camera event failed: {}", e),
            }
        }
    }

    controller.close();
    tracing::info!("Camera controller stopped");
}
