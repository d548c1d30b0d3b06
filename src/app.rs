use crate::collector::{start_collector, CollectorMessage};
use crate::config::Config;
use crate::page::GpuPage;
use crate::processes::ProcessTableView;
use crate::telemetry::TelemetrySnapshot;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::{buffer::Buffer, layout::Rect};
use std::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

/// Ticks without a snapshot before the connection is reported stale (~5s).
const STALE_TICKS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Summary,
    Gpu,
}

pub struct App {
    pub snapshot: TelemetrySnapshot,
    pub rx: Receiver<CollectorMessage>,
    pub tick_count: u64,
    pub source_label: String,
    pub connection_status: String,
    pub last_update_tick: u64,
    pub last_error: Option<String>,
    pub view_mode: ViewMode,
    pub show_help: bool,
    page: GpuPage<ProcessTableView>,
    pending_key: Option<KeyEvent>,
    pending_mouse: Option<MouseEvent>,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let collector = start_collector(config);
        Self::with_receiver(collector.rx, config.history)
    }

    pub fn with_receiver(rx: Receiver<CollectorMessage>, history: usize) -> Self {
        let snapshot = TelemetrySnapshot::default();
        let page = GpuPage::new(&snapshot, history, ProcessTableView::new());
        Self {
            snapshot,
            rx,
            tick_count: 0,
            source_label: "connecting...".to_string(),
            connection_status: "connecting".to_string(),
            last_update_tick: 0,
            last_error: None,
            view_mode: ViewMode::Gpu,
            show_help: false,
            page,
            pending_key: None,
            pending_mouse: None,
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn cycle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Summary => ViewMode::Gpu,
            ViewMode::Gpu => ViewMode::Summary,
        };
        debug!(view = ?self.view_mode, "view changed");
    }

    /// Queue an event for the GPU page; it is consumed by the next redraw.
    pub fn forward_key(&mut self, key: KeyEvent) {
        self.pending_key = Some(key);
    }

    pub fn forward_mouse(&mut self, mouse: MouseEvent) {
        self.pending_mouse = Some(mouse);
    }

    pub fn draw_gpu_page(&mut self, buf: &mut Buffer, area: Rect) {
        let key = self.pending_key.take();
        let mouse = self.pending_mouse.take();
        self.page
            .draw(buf, area, &self.snapshot, key.as_ref(), mouse.as_ref());
    }

    pub fn page(&self) -> &GpuPage<ProcessTableView> {
        &self.page
    }

    pub fn shutdown(&mut self) {
        info!("closing GPU page");
        self.page.close();
    }

    pub fn on_tick(&mut self) {
        self.tick_count += 1;

        while let Ok(event) = self.rx.try_recv() {
            match event {
                CollectorMessage::Snapshot(snapshot) => {
                    self.snapshot = snapshot;
                    self.last_update_tick = self.tick_count;
                    self.last_error = None;
                    if !self.connection_status.starts_with("connected") {
                        self.connection_status = connection_label(&self.source_label);
                    }
                }
                CollectorMessage::SourceLabel(label) => {
                    self.connection_status = connection_label(&label);
                    self.source_label = label;
                }
                CollectorMessage::Error(err) => {
                    warn!("collector: {err}");
                    self.connection_status = format!("error: {err}");
                    self.last_error = Some(err);
                }
            }
        }

        if self.tick_count.saturating_sub(self.last_update_tick) > STALE_TICKS
            && self.connection_status.starts_with("connected")
        {
            self.connection_status = "no data (timeout)".to_string();
        }
    }
}

fn connection_label(source: &str) -> String {
    if source.contains("synthetic") {
        "demo mode (synthetic)".to_string()
    } else if source.contains("socket") {
        "connected (socket)".to_string()
    } else {
        "connected".to_string()
    }
}
