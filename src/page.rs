//! The GPU page: temperature line, one band per accelerator and the process
//! table underneath.

use crate::format::{format_quantity, format_status, Quantity};
use crate::layout::{partition, DeviceLayout};
use crate::surface::put_str;
use crate::telemetry::{DeviceRecord, TelemetrySnapshot};
use crate::widgets::{render_gauge, GaugeSpec, HistoryChart, NOT_AVAILABLE};
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
};
use std::collections::BTreeMap;
use tracing::debug;

const CHART_COLOR: Color = Color::Green;
const FREQ_COLOR: Color = Color::Cyan;
const SUBUNIT_OFF: &str = "OFF";

/// Whatever fills the space below the device bands. It receives the input
/// events routed to the page.
pub trait ProcessTable {
    fn draw(
        &mut self,
        buf: &mut Buffer,
        area: Rect,
        snapshot: &TelemetrySnapshot,
        key: Option<&KeyEvent>,
        mouse: Option<&MouseEvent>,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Constructed,
    Active,
    Closed,
}

pub struct GpuPage<T> {
    state: PageState,
    charts: BTreeMap<String, HistoryChart>,
    history: usize,
    process_table: T,
}

/// Chart sample for one device: its load, nothing when it reports no status.
pub fn load_sample(device: &DeviceRecord) -> Vec<f64> {
    device
        .load()
        .map(|load| vec![load.clamp(0.0, 100.0)])
        .unwrap_or_default()
}

impl<T: ProcessTable> GpuPage<T> {
    pub fn new(snapshot: &TelemetrySnapshot, history: usize, process_table: T) -> Self {
        let mut page = Self {
            state: PageState::Constructed,
            charts: BTreeMap::new(),
            history,
            process_table,
        };
        page.reconcile(&snapshot.device_keys());
        page
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn chart(&self, key: &str) -> Option<&HistoryChart> {
        self.charts.get(key)
    }

    pub fn chart_keys(&self) -> impl Iterator<Item = &str> {
        self.charts.keys().map(String::as_str)
    }

    pub fn process_table(&self) -> &T {
        &self.process_table
    }

    pub fn close(&mut self) {
        self.charts.clear();
        self.state = PageState::Closed;
    }

    /// Keep exactly one chart per device currently reported.
    fn reconcile(&mut self, keys: &[String]) {
        self.charts.retain(|key, _| {
            let keep = keys.contains(key);
            if !keep {
                debug!(device = %key, "retiring chart");
            }
            keep
        });
        for key in keys {
            if !self.charts.contains_key(key) {
                debug!(device = %key, capacity = self.history, "new chart");
                self.charts
                    .insert(key.clone(), HistoryChart::new(key.clone(), self.history, CHART_COLOR));
            }
        }
    }

    pub fn draw(
        &mut self,
        buf: &mut Buffer,
        area: Rect,
        snapshot: &TelemetrySnapshot,
        key: Option<&KeyEvent>,
        mouse: Option<&MouseEvent>,
    ) {
        if self.state == PageState::Closed {
            return;
        }
        self.state = PageState::Active;

        let keys = snapshot.device_keys();
        self.reconcile(&keys);
        let layout = partition(area, snapshot.devices.len(), &snapshot.subunit_counts());

        draw_temperatures(buf, layout.temperature, snapshot);

        if let Some(placeholder) = layout.placeholder.filter(|r| !r.is_empty()) {
            render_gauge(
                buf,
                placeholder.x,
                placeholder.y,
                placeholder.width,
                &GaugeSpec::offline("GPU", CHART_COLOR),
            );
        }

        for ((device, key), region) in snapshot.devices.iter().zip(&keys).zip(&layout.devices) {
            if let Some(chart) = self.charts.get_mut(key) {
                chart.tick(snapshot, |_, _| load_sample(device));
                chart.draw(buf, region.chart, Some(&chart_label(device)));
            }
            draw_status(buf, region, device);
            draw_frequency(buf, region, device);
        }

        self.process_table
            .draw(buf, layout.process_table, snapshot, key, mouse);
    }
}

fn chart_label(device: &DeviceRecord) -> String {
    let governor = device
        .freq
        .as_ref()
        .map(|f| f.governor.as_str())
        .filter(|g| !g.is_empty())
        .unwrap_or("-");
    match device.load() {
        Some(load) => format!(
            "{:>3.0}% - gov: {} - name: {}",
            load.clamp(0.0, 100.0),
            governor,
            device.name
        ),
        None => format!("{} - name: {}", NOT_AVAILABLE, device.name),
    }
}

fn draw_temperatures(buf: &mut Buffer, area: Rect, snapshot: &TelemetrySnapshot) {
    if area.is_empty() {
        return;
    }
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let right = area.right();
    let mut x = put_str(buf, area.x + 1, area.y, "Temperatures:", area.width.saturating_sub(1), bold);
    for (name, temp) in snapshot.gpu_temperatures() {
        let start = x.saturating_add(1);
        x = put_str(buf, start, area.y, name, right.saturating_sub(start), bold);
        let start = x.saturating_add(1);
        x = put_str(
            buf,
            start,
            area.y,
            &format!("{temp:.1}C"),
            right.saturating_sub(start),
            Style::default(),
        );
    }
}

/// `name value`, value colored; clipped to `width`.
fn plot_name_info(buf: &mut Buffer, slot: Rect, name: &str, value: &str, color: Color) {
    if slot.is_empty() {
        return;
    }
    // the slot's last column separates it from the next field
    let end = slot.right() - 1;
    let x = put_str(
        buf,
        slot.x,
        slot.y,
        name,
        end.saturating_sub(slot.x),
        Style::default().add_modifier(Modifier::BOLD),
    );
    put_str(buf, x + 1, slot.y, value, end.saturating_sub(x + 1), Style::default().fg(color));
}

fn draw_status(buf: &mut Buffer, region: &DeviceLayout, device: &DeviceRecord) {
    let [railgate, scaling, power, tpc] = region.status;
    if let Some(status) = &device.status {
        let (label, color) = format_status(status.railgate, "Active", "Disable");
        plot_name_info(buf, railgate, "Railgate", &label, color);
        let (label, color) = format_status(status.scaling_3d, "Active", "Disable");
        plot_name_info(buf, scaling, "3D scaling", &label, color);
        let (label, color) = format_status(status.tpc_pg_mask, "ON", "OFF");
        plot_name_info(buf, tpc, "TPC PG", &label, color);
    }
    if let Some(control) = &device.power_control {
        plot_name_info(buf, power, "Power ctrl", control, Color::Reset);
    }
}

fn draw_frequency(buf: &mut Buffer, region: &DeviceLayout, device: &DeviceRecord) {
    let main = region.frequency;
    if main.is_empty() {
        return;
    }
    let Some(freq) = &device.freq else {
        render_gauge(buf, main.x, main.y, main.width - 1, &GaugeSpec::offline("Frq", FREQ_COLOR));
        return;
    };
    let spec = GaugeSpec::frequency("Frq", freq.cur, freq.unit, FREQ_COLOR).with_range(freq.min, freq.max);
    render_gauge(buf, main.x, main.y, main.width - 1, &spec);

    for (idx, (slot, value)) in region.subunits.iter().zip(device.subunits()).enumerate() {
        if slot.is_empty() {
            continue;
        }
        let spec = GaugeSpec::frequency(format!("GPC{idx}"), *value, freq.unit, FREQ_COLOR)
            .online(*value > 0.0)
            .with_message(SUBUNIT_OFF);
        render_gauge(buf, slot.x, slot.y, slot.width - 1, &spec);
    }
}

/// One load gauge per device for the summary view. Returns the rows used.
pub fn compact_gpu(buf: &mut Buffer, area: Rect, snapshot: &TelemetrySnapshot) -> u16 {
    if area.is_empty() {
        return 0;
    }
    let x = area.x + 1;
    let width = area.width.saturating_sub(2);

    if snapshot.devices.is_empty() {
        render_gauge(buf, x, area.y, width, &GaugeSpec::offline("GPU", CHART_COLOR));
        return 1;
    }

    let mut rows = 0;
    for (idx, device) in snapshot.devices.iter().enumerate() {
        if rows >= area.height {
            break;
        }
        let name = if idx == 0 {
            "GPU".to_string()
        } else {
            format!("GPU{idx}")
        };
        let spec = match device.load() {
            Some(load) => {
                let spec = GaugeSpec::plain(name, load, CHART_COLOR);
                match &device.freq {
                    Some(freq) => spec.with_annotation(format_quantity(freq.cur, freq.unit, Quantity::Frequency)),
                    None => spec,
                }
            }
            None => GaugeSpec::offline(name, CHART_COLOR),
        };
        render_gauge(buf, x, area.y + rows, width, &spec);
        rows += 1;
    }
    rows
}
