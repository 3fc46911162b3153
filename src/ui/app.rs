//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询键盘事件并转为控制器事件，每帧拉取控制器快照与宿主状态后用 draw 渲染。
//! 权限被拒绝时显示终止信息，片刻后自动退出；关闭 token 被取消（SIGTERM）时同样退出循环，终端总会被恢复。

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::{CameraHandle, UiState};
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::host::TuiHost;
use crate::ui::render::draw;

/// 终止信息显示时长
const TERMINAL_MESSAGE_LINGER: Duration = Duration::from_secs(2);

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    handle: CameraHandle,
    host: Arc<TuiHost>,
    state_rx: watch::Receiver<UiState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, handle, host, state_rx, shutdown).await;

    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    handle: CameraHandle,
    host: Arc<TuiHost>,
    state_rx: watch::Receiver<UiState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut events = EventHandler::new(handle.clone(), host);
    events.attach_surface();

    let mut terminal_since: Option<Instant> = None;

    loop {
        if shutdown.is_cancelled() {
            tracing::info!("Shutdown requested, leaving TUI");
            break;
        }

        let mut state = state_rx.borrow().clone();
        match handle.snapshot().await {
            Ok(snapshot) => state.snapshot = snapshot,
            Err(e) => {
                tracing::info!("Controller gone, leaving TUI: {}", e);
                break;
            }
        }

        if state.terminal_message.is_some() {
            let since = *terminal_since.get_or_insert_with(Instant::now);
            if since.elapsed() >= TERMINAL_MESSAGE_LINGER {
                break;
            }
        }

        terminal.draw(|f| draw(f, &state))?;

        if let Some(AppEvent::Quit) = events.poll()? {
            break;
        }

        tokio::task::yield_now().await;
    }

    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
