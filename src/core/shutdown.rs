//! 优雅关闭
//!
//! Ctrl+C / SIGTERM 只取消根 token：未到期的对焦重试随之作废，TUI 主循环看到取消后自行退出并恢复终端。
//! 应用结束后再按注册顺序执行清理（停止预览、释放摄像头）。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::{CameraError, CameraHandle};

/// 单个清理任务的超时
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// 关闭原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户退出（q 键、Ctrl+C 或权限被拒绝后界面结束）
    UserInitiated,
    /// SIGTERM
    Signal,
}

/// 关闭信号：持有根 token，重试调度器与 TUI 主循环共用
#[derive(Clone, Debug, Default)]
pub struct ShutdownManager {
    token: CancellationToken,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 触发关闭；重复调用只有第一次生效
    pub fn shutdown(&self, reason: ShutdownReason) {
        if self.token.is_cancelled() {
            return;
        }
        tracing::info!(?reason, "Shutting down camera controller");
        self.token.cancel();
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C");
                manager.shutdown(ShutdownReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM");
                    manager.shutdown(ShutdownReason::Signal);
                }
            });
        }
    }
}

/// 关闭时需要执行的清理任务
#[async_trait::async_trait]
pub trait ShutdownCleanup: Send + Sync {
    async fn cleanup(&self) -> anyhow::Result<()>;

    /// 清理任务名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 按注册顺序执行清理，单个任务失败或超时不影响后续任务
#[derive(Default)]
pub struct ShutdownCoordinator {
    cleanups: Vec<Box<dyn ShutdownCleanup>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: ShutdownCleanup + 'static>(&mut self, task: T) {
        self.cleanups.push(Box::new(task));
    }

    pub async fn run_cleanup(&self) {
        for task in &self.cleanups {
            let name = task.name();
            match tokio::time::timeout(CLEANUP_TIMEOUT, task.cleanup()).await {
                Ok(Ok(())) => tracing::info!("Cleanup '{}' done", name),
                Ok(Err(e)) => tracing::warn!("Cleanup '{}' failed: {}", name, e),
                Err(_) => tracing::warn!("Cleanup '{}' timed out", name),
            }
        }
    }
}

/// 摄像头释放：拆除会话并停止控制器任务；控制器已停止视为成功
pub struct CameraReleaseCleanup {
    handle: CameraHandle,
}

impl CameraReleaseCleanup {
    pub fn new(handle: CameraHandle) -> Self {
        Self { handle }
    }
}

#[async_trait::async_trait]
impl ShutdownCleanup for CameraReleaseCleanup {
    async fn cleanup(&self) -> anyhow::Result<()> {
        match self.handle.shutdown().await {
            Ok(()) | Err(CameraError::ControllerStopped) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "CameraRelease"
    }
}

/// 运行应用直到它自行结束，然后取消根 token 并执行清理。
///
/// 应用必须监听 `manager.token()`：收到信号时由应用自己退出（例如先恢复终端），这里不会中途丢弃它。
pub async fn run_until_shutdown<Fut>(
    manager: Arc<ShutdownManager>,
    app: Fut,
    coordinator: ShutdownCoordinator,
) -> Fut::Output
where
    Fut: Future,
{
    manager.install_signal_handlers();

    let output = app.await;
    manager.shutdown(ShutdownReason::UserInitiated);
    coordinator.run_cleanup().await;
    output
}
