//! 界面渲染
//!
//! 标题栏显示 `<应用名> - <对焦状态>`，主体为会话 / 对焦快照，底部为快捷键提示；
//! 权限提示与终止信息以醒目颜色显示在主体顶部。

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::core::{FocusState, FocusStatus, PermissionState, UiState};

fn yes_no(v: bool) -> &'static str {
    if v {
        "是"
    } else {
        "否"
    }
}

fn row(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:<10}", label),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(value),
    ])
}

/// 绘制一帧
pub fn draw(f: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(f.area());

    let title_color = match state.status {
        Some(FocusStatus::Locked) => Color::Green,
        Some(FocusStatus::Focusing) => Color::Yellow,
        None => Color::Gray,
    };
    let block = Block::default()
        .title(format!(" {} ", state.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(title_color));

    let snap = &state.snapshot;
    let mut lines: Vec<Line> = Vec::new();

    if let Some(msg) = &state.terminal_message {
        lines.push(Line::from(Span::styled(
            msg.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
    } else if state.permission_prompt {
        lines.push(Line::from(Span::styled(
            "需要摄像头权限：按 y 允许，按 n 拒绝",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
    }

    let permission = match snap.permission {
        PermissionState::Unknown => "未检查",
        PermissionState::Requested => "等待授权",
        PermissionState::Granted => "已授权",
        PermissionState::Denied => "已拒绝",
    };
    let focus = match snap.focus_state {
        FocusState::Idle => "空闲",
        FocusState::Focusing => "对焦中…",
    };
    let orientation = snap
        .orientation_degrees
        .map(|d| format!("{}°", d))
        .unwrap_or_else(|| "-".to_string());

    lines.push(row("表面", yes_no(snap.surface_ready).to_string()));
    lines.push(row("权限", permission.to_string()));
    lines.push(row("摄像头", yes_no(snap.session_open).to_string()));
    lines.push(row("预览", yes_no(snap.preview_active).to_string()));
    lines.push(row("旋转", format!("{}°", snap.rotation_degrees)));
    lines.push(row("预览方向", orientation));
    lines.push(row("对焦", focus.to_string()));
    lines.push(row("尝试次数", snap.attempt_count.to_string()));
    lines.push(row("等待重试", yes_no(snap.retry_pending).to_string()));

    let body = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(body, chunks[0]);

    let hint = " Enter/f 对焦 │ r 旋转 │ s 表面开关 │ y/n 权限 │ q 退出 ";
    let footer = Paragraph::new(Line::from(Span::styled(
        hint,
        Style::default().fg(Color::DarkGray),
    )))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[1]);
}
