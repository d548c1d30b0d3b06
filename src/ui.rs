use crate::app::{App, ViewMode};
use crate::page::compact_gpu;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(f.area());

    render_header(f, chunks[0], app);
    match app.view_mode {
        ViewMode::Summary => render_summary(f, chunks[1], app),
        ViewMode::Gpu => app.draw_gpu_page(f.buffer_mut(), chunks[1]),
    }

    if app.show_help {
        render_help(f);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let status_color = connection_color(&app.connection_status);
    let header_text = Line::from(vec![
        Span::styled(
            "gpuscope ",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "- {}",
                app.snapshot
                    .timestamp
                    .clone()
                    .unwrap_or_else(|| "awaiting data".to_string())
            ),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("  {} | {}", app.source_label, app.connection_status),
            Style::default().fg(status_color),
        ),
    ]);

    let title = match app.view_mode {
        ViewMode::Summary => "Summary (v: GPU, h: help)",
        ViewMode::Gpu => "GPU (v: summary, h: help)",
    };
    let header = Paragraph::new(header_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(status_color))
            .title(title),
    );
    f.render_widget(header, area);
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title("GPU")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let used = compact_gpu(f.buffer_mut(), inner, &app.snapshot);
    let rest = Rect {
        y: inner.y + used.min(inner.height),
        height: inner.height.saturating_sub(used),
        ..inner
    };

    let mut lines = vec![Line::from(Span::styled(
        " Temperatures",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    lines.extend(app.snapshot.temperatures.iter().map(|(name, temp)| {
        Line::from(vec![
            Span::raw(format!("  {name:<10}")),
            Span::styled(format!("{temp:>6.1}C"), Style::default().fg(temp_color(*temp))),
        ])
    }));
    f.render_widget(Paragraph::new(lines), rest);
}

fn temp_color(temp: f32) -> Color {
    if temp >= 80.0 {
        Color::Red
    } else if temp >= 60.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn connection_color(status: &str) -> Color {
    if status.starts_with("connected") {
        Color::Green
    } else if status.starts_with("demo") {
        Color::Gray
    } else if status.starts_with("error") || status.starts_with("no data") {
        Color::Red
    } else {
        Color::Yellow
    }
}

fn render_help(f: &mut Frame) {
    let area = centered_rect(60, 50, f.area());
    let help_text = vec![
        Line::from("Keys:"),
        Line::from("  q: quit"),
        Line::from("  h: toggle help"),
        Line::from("  v: switch view (GPU / summary)"),
        Line::from("  s: sort processes (CPU / memory)"),
        Line::from("  Up/Down, mouse wheel: move in the process list"),
        Line::from(""),
        Line::from("Sources (GPUSCOPE_SOURCE):"),
        Line::from("  auto, synthetic, tegrastats, socket, file"),
        Line::from("  Socket: GPUSCOPE_SOCKET_PATH (default /tmp/jetsonscope.sock)"),
    ];
    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let para = Paragraph::new(help_text)
        .block(block)
        .style(Style::default().fg(Color::White));
    f.render_widget(Clear, area);
    f.render_widget(para, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
