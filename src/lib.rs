//! AutoFocus - 单摄像头会话与按键对焦控制器
//!
//! 模块划分：
//! - **camera**: 设备抽象（CameraDevice / CameraProvider）、旋转映射、宿主回调能力、模拟摄像头
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、状态投影、重试调度、单写者主控循环、优雅关闭
//! - **focus**: 对焦周期与重试状态机
//! - **observability**: 日志初始化
//! - **session**: 设备获取/释放、预览、权限、宿主接口
//! - **ui**: Ratatui TUI 演示宿主

pub mod camera;
pub mod config;
pub mod core;
pub mod focus;
pub mod observability;
pub mod session;
pub mod ui;
