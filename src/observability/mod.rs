//! 可观测性

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 日志写入文件：默认 info，可通过 RUST_LOG 覆盖。TUI 占用终端，日志不输出到 stdout。
pub fn init_with_file(path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}
