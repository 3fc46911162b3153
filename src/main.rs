//! AutoFocus - 按键对焦摄像头演示
//!
//! 入口：加载配置、初始化日志、启动摄像头控制器与 TUI，并在退出时释放摄像头。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use autofocus::{
    camera::SimulatedCameraProvider,
    config::{load_config, AppConfig},
    core::{
        run_until_shutdown, spawn_camera_controller, CameraReleaseCleanup, ShutdownCoordinator,
        ShutdownManager,
    },
    observability,
    ui::{run_app, TuiHost},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 第一个参数可指定额外的配置文件
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let (cfg, config_err) = match load_config(config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // TUI 占用终端，日志只写文件
    if let Some(path) = &cfg.app.log_file {
        observability::init_with_file(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
    }
    if let Some(e) = config_err {
        tracing::warn!("Failed to load config, using defaults: {}", e);
    }

    let shutdown = Arc::new(ShutdownManager::new());

    let (host, state_rx) = TuiHost::new(&cfg.app.name, cfg.simulator.permission_granted);
    let host = Arc::new(host);
    let provider = SimulatedCameraProvider::from_config(&cfg.simulator);

    let (handle, controller_task) = spawn_camera_controller(
        &cfg,
        Box::new(provider),
        host.clone(),
        shutdown.token(),
    )
    .context("Failed to start camera controller")?;

    let mut coordinator = ShutdownCoordinator::new();
    coordinator.register(CameraReleaseCleanup::new(handle.clone()));

    // 信号只取消 token，TUI 自行退出并恢复终端后才释放摄像头
    let app = run_app(handle, host, state_rx, shutdown.token());
    let app_result = run_until_shutdown(shutdown, app, coordinator).await;

    if let Err(e) = controller_task.await {
        tracing::warn!("Camera controller task failed: {}", e);
    }

    app_result.context("App run failed")
}
