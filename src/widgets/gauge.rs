//! Single-row gauges: load bars and frequency readouts.

use crate::format::{format_quantity, Magnitude, Quantity};
use crate::surface::{put_cell, put_str, put_str_right, text_width};
use ratatui::{
    buffer::Buffer,
    style::{Color, Modifier, Style},
};

pub const NOT_AVAILABLE: &str = "NOT AVAILABLE";
/// Columns reserved at the right edge for a frequency readout.
pub const ANNOTATION_WIDTH: u16 = 8;
const FILL: &str = " ";

#[derive(Debug, Clone, PartialEq)]
pub enum GaugeKind {
    /// Bar filled to `percent` of its width.
    Plain { percent: f64 },
    /// Current frequency, optionally placed within its min..max range.
    Frequency {
        current: f64,
        min: Option<f64>,
        max: Option<f64>,
        unit: Magnitude,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSpec {
    pub name: String,
    pub kind: GaugeKind,
    pub color: Color,
    pub online: bool,
    pub offline_color: Color,
    /// Offline text, `NOT AVAILABLE` when unset.
    pub message: Option<String>,
    /// Right-aligned side text for plain gauges (usually the frequency).
    pub annotation: Option<String>,
}

impl GaugeSpec {
    pub fn plain(name: impl Into<String>, percent: f64, color: Color) -> Self {
        Self::new(name, GaugeKind::Plain { percent }, color)
    }

    pub fn frequency(name: impl Into<String>, current: f64, unit: Magnitude, color: Color) -> Self {
        Self::new(
            name,
            GaugeKind::Frequency {
                current,
                min: None,
                max: None,
                unit,
            },
            color,
        )
    }

    fn new(name: impl Into<String>, kind: GaugeKind, color: Color) -> Self {
        Self {
            name: name.into(),
            kind,
            color,
            online: true,
            offline_color: Color::DarkGray,
            message: None,
            annotation: None,
        }
    }

    /// Offline gauge; the kind carries no reading and is never inspected.
    pub fn offline(name: impl Into<String>, color: Color) -> Self {
        Self::plain(name, f64::NAN, color).online(false)
    }

    pub fn online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    pub fn with_range(mut self, lo: Option<f64>, hi: Option<f64>) -> Self {
        if let GaugeKind::Frequency { min, max, .. } = &mut self.kind {
            *min = lo;
            *max = hi;
        }
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_offline_color(mut self, color: Color) -> Self {
        self.offline_color = color;
        self
    }
}

/// Draw `spec` on row `y`, columns `x..x + width`.
pub fn render_gauge(buf: &mut Buffer, x: u16, y: u16, width: u16, spec: &GaugeSpec) {
    if width == 0 {
        return;
    }
    if !spec.online {
        render_offline(buf, x, y, width, spec);
        return;
    }
    match &spec.kind {
        GaugeKind::Plain { percent } => {
            let fraction = if percent.is_finite() {
                percent.clamp(0.0, 100.0) / 100.0
            } else {
                0.0
            };
            let text = format!("{:.0}%", fraction * 100.0);
            render_plain(buf, x, y, width, spec, fraction, &text);
        }
        GaugeKind::Frequency {
            current,
            min,
            max,
            unit,
        } => {
            let fraction = match (min, max) {
                (Some(lo), Some(hi)) if hi > lo && current.is_finite() => {
                    Some(((current - lo) / (hi - lo)).clamp(0.0, 1.0))
                }
                _ => None,
            };
            let value = format_quantity(*current, *unit, Quantity::Frequency);
            render_frequency(buf, x, y, width, spec, fraction, &value);
        }
    }
}

fn label_style(spec: &GaugeSpec) -> Style {
    Style::default().fg(spec.color).add_modifier(Modifier::BOLD)
}

fn render_offline(buf: &mut Buffer, x: u16, y: u16, width: u16, spec: &GaugeSpec) {
    let message = spec.message.as_deref().unwrap_or(NOT_AVAILABLE);
    let name_width = text_width(&spec.name);
    if name_width + 1 + text_width(message) > width {
        return;
    }
    put_str(buf, x, y, &spec.name, name_width, label_style(spec));
    put_str_right(
        buf,
        x,
        y,
        width,
        message,
        Style::default().fg(spec.offline_color).add_modifier(Modifier::BOLD),
    );
}

/// `NAME [||||||    75%] annotation`
fn render_plain(
    buf: &mut Buffer,
    x: u16,
    y: u16,
    width: u16,
    spec: &GaugeSpec,
    fraction: f64,
    text: &str,
) {
    let annotation_cols = if spec.annotation.is_some() {
        ANNOTATION_WIDTH
    } else {
        0
    };
    let name_width = text_width(&spec.name);
    let reserved = name_width + 3 + annotation_cols;
    let bar_width = width.saturating_sub(reserved);
    if bar_width == 0 {
        return;
    }

    put_str(buf, x, y, &spec.name, name_width, label_style(spec));
    let bar_x = x + name_width + 2;
    put_cell(buf, bar_x - 1, y, "[", Style::default().add_modifier(Modifier::BOLD));
    draw_bar(buf, bar_x, y, bar_width, fraction, spec.color);
    if text_width(text) <= bar_width {
        put_str_right(buf, bar_x, y, bar_width, text, Style::default().add_modifier(Modifier::BOLD));
    }
    put_cell(buf, bar_x + bar_width, y, "]", Style::default().add_modifier(Modifier::BOLD));

    if let Some(annotation) = &spec.annotation {
        put_str_right(
            buf,
            x + width - ANNOTATION_WIDTH,
            y,
            ANNOTATION_WIDTH,
            annotation,
            Style::default().add_modifier(Modifier::ITALIC),
        );
    }
}

/// `NAME [|||     ]  1.3GHz`, or `NAME  1.3GHz` without a known range.
fn render_frequency(
    buf: &mut Buffer,
    x: u16,
    y: u16,
    width: u16,
    spec: &GaugeSpec,
    fraction: Option<f64>,
    value: &str,
) {
    let name_width = text_width(&spec.name);
    let value_width = text_width(value);
    if name_width + value_width > width {
        return;
    }
    put_str(buf, x, y, &spec.name, name_width, label_style(spec));

    // the gap after the name is the first column given up in a narrow slot
    let gap = u16::from(name_width + 1 + value_width <= width);
    let readout_width = value_width.max(ANNOTATION_WIDTH).min(width - name_width - gap);
    put_str_right(
        buf,
        x + width - readout_width,
        y,
        readout_width,
        value,
        Style::default().add_modifier(Modifier::ITALIC),
    );

    // " [" + bar + "] " between name and readout
    let bar_width = (width - name_width - readout_width).saturating_sub(4);
    if let (Some(fraction), true) = (fraction, bar_width > 0) {
        let bar_x = x + name_width + 2;
        put_cell(buf, bar_x - 1, y, "[", Style::default().add_modifier(Modifier::BOLD));
        draw_bar(buf, bar_x, y, bar_width, fraction, spec.color);
        put_cell(buf, bar_x + bar_width, y, "]", Style::default().add_modifier(Modifier::BOLD));
    }
}

/// Number of filled cells for `fraction` of `width`, rounded down.
pub fn filled_cells(fraction: f64, width: u16) -> u16 {
    ((fraction.clamp(0.0, 1.0) * f64::from(width)).floor() as u16).min(width)
}

fn draw_bar(buf: &mut Buffer, x: u16, y: u16, width: u16, fraction: f64, color: Color) {
    let filled = filled_cells(fraction, width);
    for col in 0..width {
        let style = if col < filled {
            Style::default().bg(color)
        } else {
            Style::default()
        };
        put_cell(buf, x + col, y, FILL, style);
    }
}
