//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AUTOFOCUS__*` 覆盖（双下划线表示嵌套，如 `AUTOFOCUS__FOCUS__RETRY_INTERVAL_MS=20`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::camera::FocusMode;
use crate::core::CameraError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub focus: FocusSection,
    #[serde(default)]
    pub status: StatusSection,
    #[serde(default)]
    pub simulator: SimulatorSection,
}

/// [app] 段：应用名（标题前缀）、日志文件
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,
    /// TUI 占用终端时日志写入此文件；未设置则不输出日志
    pub log_file: Option<PathBuf>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_file: None,
        }
    }
}

fn default_app_name() -> String {
    "AutoFocus".to_string()
}

/// [focus] 段：对焦模式、重试间隔、最大尝试次数
#[derive(Debug, Clone, Deserialize)]
pub struct FocusSection {
    /// 单次对焦模式，不允许 continuous-*
    #[serde(default = "default_focus_mode")]
    pub mode: FocusMode,
    /// cancelAutoFocus 与下一次 autoFocus 之间的间隔（毫秒）
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// 单个对焦周期的最大尝试次数；未设置表示一直重试直到锁定或会话结束
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for FocusSection {
    fn default() -> Self {
        Self {
            mode: default_focus_mode(),
            retry_interval_ms: default_retry_interval_ms(),
            max_attempts: None,
        }
    }
}

impl FocusSection {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

fn default_focus_mode() -> FocusMode {
    FocusMode::Auto
}

fn default_retry_interval_ms() -> u64 {
    10
}

/// [status] 段：标题栏状态文本与权限拒绝提示
#[derive(Debug, Clone, Deserialize)]
pub struct StatusSection {
    #[serde(default = "default_focusing_label")]
    pub focusing: String,
    #[serde(default = "default_locked_label")]
    pub locked: String,
    #[serde(default = "default_permission_denied_message")]
    pub permission_denied: String,
}

impl Default for StatusSection {
    fn default() -> Self {
        Self {
            focusing: default_focusing_label(),
            locked: default_locked_label(),
            permission_denied: default_permission_denied_message(),
        }
    }
}

fn default_focusing_label() -> String {
    "focusing".to_string()
}

fn default_locked_label() -> String {
    "locked".to_string()
}

fn default_permission_denied_message() -> String {
    "Sorry! Camera permission required".to_string()
}

/// [simulator] 段：演示程序使用的模拟摄像头
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorSection {
    /// 一次对焦扫描耗时（毫秒）
    #[serde(default = "default_scan_duration_ms")]
    pub scan_duration_ms: u64,
    /// 每次锁定之前失败的扫描次数
    #[serde(default = "default_failures_before_lock")]
    pub failures_before_lock: u32,
    /// 启动时是否已持有摄像头权限
    #[serde(default = "default_permission_granted")]
    pub permission_granted: bool,
}

impl Default for SimulatorSection {
    fn default() -> Self {
        Self {
            scan_duration_ms: default_scan_duration_ms(),
            failures_before_lock: default_failures_before_lock(),
            permission_granted: default_permission_granted(),
        }
    }
}

fn default_scan_duration_ms() -> u64 {
    150
}

fn default_failures_before_lock() -> u32 {
    3
}

fn default_permission_granted() -> bool {
    false
}

impl AppConfig {
    /// 校验：对焦模式必须是单次模式，重试间隔必须大于 0
    pub fn validate(&self) -> Result<(), CameraError> {
        if self.focus.mode.is_continuous() {
            return Err(CameraError::ConfigError(format!(
                "focus.mode '{}' is continuous; push-to-focus needs a single-shot mode",
                self.focus.mode
            )));
        }
        if self.focus.retry_interval_ms == 0 {
            return Err(CameraError::ConfigError(
                "focus.retry_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.focus.max_attempts == Some(0) {
            return Err(CameraError::ConfigError(
                "focus.max_attempts must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 AUTOFOCUS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AUTOFOCUS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AUTOFOCUS")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
