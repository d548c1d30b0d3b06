use crate::page::ProcessTable;
use crate::telemetry::{ProcessEntry, TelemetrySnapshot};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Row, StatefulWidget, Table, TableState},
};
use sysinfo::{System, Uid};

/// Samples the local process list for sources that do not carry one.
pub struct ProcessSampler {
    system: System,
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSampler {
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
        }
    }

    pub fn refresh(&mut self) {
        self.system.refresh_all(); // full refresh to keep CPU/mem accurate
    }

    pub fn top_processes(&mut self, limit: usize) -> Vec<ProcessEntry> {
        self.refresh();
        let mut processes: Vec<ProcessEntry> = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                user: process.user_id().map(|uid: &Uid| uid.to_string()),
                name: process.name().to_string_lossy().to_string(),
                cpu_percent: process.cpu_usage(),
                memory_kb: process.memory() / 1024,
                gpu_memory_kb: None,
                threads: process.tasks().map(|t| t.len()),
            })
            .collect();

        sort_processes(&mut processes, SortColumn::Cpu);
        processes.truncate(limit);
        processes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Cpu,
    Memory,
}

impl SortColumn {
    fn toggle(self) -> Self {
        match self {
            SortColumn::Cpu => SortColumn::Memory,
            SortColumn::Memory => SortColumn::Cpu,
        }
    }
}

pub fn sort_processes(processes: &mut [ProcessEntry], column: SortColumn) {
    match column {
        SortColumn::Cpu => processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent)),
        SortColumn::Memory => processes.sort_by(|a, b| b.memory_kb.cmp(&a.memory_kb)),
    }
}

/// Process list below the device bands. `s` switches the sort column,
/// arrows and the mouse wheel move the selection.
pub struct ProcessTableView {
    sort: SortColumn,
    state: TableState,
}

impl Default for ProcessTableView {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTableView {
    pub fn new() -> Self {
        Self {
            sort: SortColumn::Cpu,
            state: TableState::default(),
        }
    }

    pub fn sort(&self) -> SortColumn {
        self.sort
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected()
    }

    fn handle_input(&mut self, key: Option<&KeyEvent>, mouse: Option<&MouseEvent>, rows: usize) {
        if let Some(key) = key {
            match key.code {
                KeyCode::Char('s') => self.sort = self.sort.toggle(),
                KeyCode::Down => self.move_selection(1, rows),
                KeyCode::Up => self.move_selection(-1, rows),
                _ => {}
            }
        }
        if let Some(mouse) = mouse {
            match mouse.kind {
                MouseEventKind::ScrollDown => self.move_selection(1, rows),
                MouseEventKind::ScrollUp => self.move_selection(-1, rows),
                _ => {}
            }
        }
    }

    fn move_selection(&mut self, delta: isize, rows: usize) {
        if rows == 0 {
            self.state.select(None);
            return;
        }
        let next = match self.state.selected() {
            Some(current) => current.saturating_add_signed(delta).min(rows - 1),
            None => 0,
        };
        self.state.select(Some(next));
    }
}

impl ProcessTable for ProcessTableView {
    fn draw(
        &mut self,
        buf: &mut Buffer,
        area: Rect,
        snapshot: &TelemetrySnapshot,
        key: Option<&KeyEvent>,
        mouse: Option<&MouseEvent>,
    ) {
        let mut processes = snapshot.processes.clone();
        self.handle_input(key, mouse, processes.len());
        if let Some(selected) = self.state.selected() {
            if selected >= processes.len() {
                self.state.select(processes.len().checked_sub(1));
            }
        }
        if area.is_empty() {
            return;
        }
        sort_processes(&mut processes, self.sort);

        let rows: Vec<Row> = processes
            .iter()
            .map(|p| {
                let cpu_color = if p.cpu_percent > 50.0 {
                    Color::Red
                } else if p.cpu_percent > 25.0 {
                    Color::Yellow
                } else {
                    Color::Green
                };
                Row::new(vec![
                    Span::styled(p.pid.to_string(), Style::default().fg(Color::Cyan)),
                    Span::styled(
                        p.user.clone().unwrap_or_else(|| "-".to_string()),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::styled(p.name.clone(), Style::default().fg(Color::White)),
                    Span::styled(format!("{:.1}%", p.cpu_percent), Style::default().fg(cpu_color)),
                    Span::styled(
                        format!("{} MB", p.memory_kb / 1024),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::styled(
                        p.gpu_memory_kb
                            .map(|kb| format!("{} MB", kb / 1024))
                            .unwrap_or_else(|| "-".to_string()),
                        Style::default().fg(Color::Green),
                    ),
                ])
            })
            .collect();

        let by_mem = self.sort == SortColumn::Memory;
        let table = Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Length(8),
                Constraint::Min(12),
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Length(10),
            ],
        )
        .block(
            Block::default()
                .title(format!("Processes ({})", processes.len()))
                .borders(Borders::TOP),
        )
        .header(
            Row::new(vec![
                "PID",
                "User",
                "Name",
                if by_mem { "CPU" } else { "CPU (▼)" },
                if by_mem { "Mem (▼)" } else { "Mem" },
                "GPU mem",
            ])
            .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        )
        .row_highlight_style(Style::default().bg(Color::DarkGray));

        StatefulWidget::render(table, area, buf, &mut self.state);
    }
}
