//! Scrolling history chart backed by a fixed-capacity ring buffer.

use crate::surface::{put_cell, put_str};
use crate::telemetry::TelemetrySnapshot;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::bar,
};
use std::collections::VecDeque;

const EIGHTHS: [&str; 9] = [
    " ",
    bar::ONE_EIGHTH,
    bar::ONE_QUARTER,
    bar::THREE_EIGHTHS,
    bar::HALF,
    bar::FIVE_EIGHTHS,
    bar::THREE_QUARTERS,
    bar::SEVEN_EIGHTHS,
    bar::FULL,
];
const MARKER: &str = "•";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartState {
    Uninitialized,
    Populated,
}

/// One sample per tick; a sample may carry several values (one per tracked
/// metric). The first value is drawn as an area, the rest as markers.
#[derive(Debug, Clone)]
pub struct HistoryChart {
    name: String,
    capacity: usize,
    samples: VecDeque<Vec<f64>>,
    color: Color,
}

impl HistoryChart {
    pub fn new(name: impl Into<String>, capacity: usize, color: Color) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            capacity,
            samples: VecDeque::with_capacity(capacity),
            color,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn state(&self) -> ChartState {
        if self.samples.is_empty() {
            ChartState::Uninitialized
        } else {
            ChartState::Populated
        }
    }

    /// Samples from oldest to newest.
    pub fn samples(&self) -> impl Iterator<Item = &[f64]> {
        self.samples.iter().map(Vec::as_slice)
    }

    pub fn push(&mut self, sample: Vec<f64>) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Ask `producer` for this tick's values and append them.
    pub fn tick<F>(&mut self, snapshot: &TelemetrySnapshot, producer: F)
    where
        F: FnOnce(&TelemetrySnapshot, &str) -> Vec<f64>,
    {
        let sample = producer(snapshot, &self.name);
        self.push(sample);
    }

    /// Plot the newest `area.width` samples, newest at the right edge, scaled
    /// to the min/max of what is visible. `label` overwrites the top row.
    pub fn draw(&self, buf: &mut Buffer, area: Rect, label: Option<&str>) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let visible = self.samples.len().min(area.width as usize);
        let window: Vec<&[f64]> = self
            .samples
            .iter()
            .skip(self.samples.len() - visible)
            .map(Vec::as_slice)
            .collect();

        if let Some(scale) = Scale::of(&window) {
            let left = area.right() - visible as u16;
            let levels = f64::from(area.height) * 8.0;
            let area_style = Style::default().fg(self.color);
            let marker_style = Style::default().fg(Color::White);

            for (offset, sample) in window.iter().enumerate() {
                let x = left + offset as u16;
                if let Some(value) = sample.first().copied().filter(|v| v.is_finite()) {
                    let mut eighths = (scale.fraction(value) * levels).round() as usize;
                    for row in 0..area.height {
                        if eighths == 0 {
                            break;
                        }
                        let y = area.bottom() - 1 - row;
                        put_cell(buf, x, y, EIGHTHS[eighths.min(8)], area_style);
                        eighths = eighths.saturating_sub(8);
                    }
                }
                for value in sample.iter().skip(1).copied().filter(|v| v.is_finite()) {
                    let row = (scale.fraction(value) * f64::from(area.height - 1)).round() as u16;
                    put_cell(buf, x, area.bottom() - 1 - row, MARKER, marker_style);
                }
            }
        }

        if let Some(label) = label {
            put_str(
                buf,
                area.x + 1,
                area.y,
                label,
                area.width.saturating_sub(1),
                Style::default().fg(self.color).add_modifier(Modifier::BOLD),
            );
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Scale {
    lo: f64,
    hi: f64,
}

impl Scale {
    fn of(window: &[&[f64]]) -> Option<Self> {
        let (lo, hi) = window
            .iter()
            .flat_map(|sample| sample.iter().copied())
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        (lo <= hi).then_some(Scale { lo, hi })
    }

    /// A flat window fills the plot when the level is above zero.
    fn fraction(self, value: f64) -> f64 {
        let span = self.hi - self.lo;
        if span <= f64::EPSILON {
            if self.hi > 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            ((value - self.lo) / span).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::row_text;
    use proptest::prelude::*;

    fn series(chart: &HistoryChart) -> Vec<f64> {
        chart.samples().map(|s| s[0]).collect()
    }

    #[test]
    fn starts_uninitialized() {
        let chart = HistoryChart::new("gpu", 30, Color::Green);
        assert_eq!(chart.state(), ChartState::Uninitialized);
        assert!(chart.is_empty());
    }

    #[test]
    fn keeps_the_last_capacity_samples_in_order() {
        let mut chart = HistoryChart::new("gpu", 30, Color::Green);
        let snapshot = TelemetrySnapshot::default();
        for i in 0..50 {
            chart.tick(&snapshot, |_, _| vec![i as f64]);
        }
        assert_eq!(chart.state(), ChartState::Populated);
        assert_eq!(chart.len(), 30);
        assert_eq!(series(&chart), (20..50).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn producer_receives_the_chart_name() {
        let mut chart = HistoryChart::new("ga10b", 4, Color::Green);
        let mut seen = String::new();
        chart.tick(&TelemetrySnapshot::default(), |_, name| {
            seen = name.to_string();
            vec![1.0, 2.0]
        });
        assert_eq!(seen, "ga10b");
        assert_eq!(chart.samples().next(), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn draws_only_the_visible_window_rescaled() {
        let mut chart = HistoryChart::new("gpu", 64, Color::Green);
        // an old spike that scrolls out of a 4-column window
        chart.push(vec![1000.0]);
        for v in [10.0, 20.0, 30.0, 40.0] {
            chart.push(vec![v]);
        }
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        chart.draw(&mut buf, area, None);

        // 16 eighths of height: 10 -> 0, 20 -> 5, 30 -> 11, 40 -> 16
        assert_eq!(row_text(&buf, 0, 1, 4), format!(" {}{}{}", bar::FIVE_EIGHTHS, bar::FULL, bar::FULL));
        assert_eq!(row_text(&buf, 0, 0, 4), format!("  {}{}", bar::THREE_EIGHTHS, bar::FULL));
    }

    #[test]
    fn short_history_is_right_aligned() {
        let mut chart = HistoryChart::new("gpu", 64, Color::Green);
        chart.push(vec![5.0]);
        chart.push(vec![5.0]);
        let area = Rect::new(0, 0, 6, 1);
        let mut buf = Buffer::empty(area);
        chart.draw(&mut buf, area, None);
        assert_eq!(row_text(&buf, 0, 0, 6), format!("    {}{}", bar::FULL, bar::FULL));
    }

    #[test]
    fn label_overwrites_the_top_row() {
        let mut chart = HistoryChart::new("gpu", 8, Color::Green);
        for _ in 0..8 {
            chart.push(vec![50.0]);
        }
        let area = Rect::new(0, 0, 8, 2);
        let mut buf = Buffer::empty(area);
        chart.draw(&mut buf, area, Some("50%"));
        assert_eq!(row_text(&buf, 0, 0, 4), format!("{}50%", bar::FULL));
        assert_eq!(row_text(&buf, 0, 1, 8), bar::FULL.repeat(8));
    }

    #[test]
    fn empty_region_is_a_no_op() {
        let mut chart = HistoryChart::new("gpu", 8, Color::Green);
        chart.push(vec![1.0]);
        let mut buf = Buffer::empty(Rect::new(0, 0, 4, 4));
        chart.draw(&mut buf, Rect::new(0, 0, 0, 4), Some("label"));
        chart.draw(&mut buf, Rect::new(0, 0, 4, 0), Some("label"));
        assert_eq!(buf, Buffer::empty(Rect::new(0, 0, 4, 4)));
    }

    proptest! {
        #[test]
        fn ring_buffer_law(capacity in 1usize..64, ticks in 0usize..200) {
            let mut chart = HistoryChart::new("gpu", capacity, Color::Green);
            let snapshot = TelemetrySnapshot::default();
            for i in 0..ticks {
                chart.tick(&snapshot, |_, _| vec![i as f64]);
                prop_assert_eq!(chart.len(), (i + 1).min(capacity));
            }
            let expected: Vec<f64> = (ticks.saturating_sub(capacity)..ticks).map(|i| i as f64).collect();
            prop_assert_eq!(series(&chart), expected);
        }
    }
}
