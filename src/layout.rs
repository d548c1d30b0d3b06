//! Geometry of the GPU page.
//!
//! ```text
//! row 0        Temperatures: gpu 48.2C
//! device 0     chart rows ...
//!              Railgate | 3D scaling | Power ctrl | TPC PG
//!              Frq [....] 1.3GHz     GPC0 ...  GPC1 ...
//!              (margin)
//! device 1     ...
//! (remainder)
//! rest         process table
//! ```
//!
//! Regions are recomputed on every redraw, so a resize never leaves stale
//! geometry behind.

use ratatui::layout::Rect;

pub const STATUS_FIELDS: usize = 4;
/// Shares of the frequency row taken by the main frequency gauge when the
/// device reports sub-units.
pub const SUBUNIT_MARGIN: usize = 2;
const TEMPERATURE_ROWS: u16 = 1;
const STATUS_ROWS: u16 = 1;
const FREQUENCY_ROWS: u16 = 1;
const BAND_MARGIN: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLayout {
    /// The whole band, for reference; the other regions tile inside it.
    pub band: Rect,
    pub chart: Rect,
    pub status: [Rect; STATUS_FIELDS],
    pub frequency: Rect,
    pub subunits: Vec<Rect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub temperature: Rect,
    pub devices: Vec<DeviceLayout>,
    /// Present only when there is no device to show.
    pub placeholder: Option<Rect>,
    pub process_table: Rect,
}

impl PageLayout {
    /// Every drawable (non-empty) region, excluding the band containers.
    pub fn regions(&self) -> Vec<Rect> {
        let mut out = vec![self.temperature, self.process_table];
        out.extend(self.placeholder);
        for device in &self.devices {
            out.push(device.chart);
            out.extend(device.status);
            out.push(device.frequency);
            out.extend(device.subunits.iter().copied());
        }
        out.retain(|r| !r.is_empty());
        out
    }
}

fn narrow(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// Split `area` between a temperature line, one band per device and the
/// process table.
///
/// The upper two thirds of the page hold the temperature line and the
/// device bands; each device gets `usable_rows / device_count` rows and the
/// remainder stays empty rather than being spread unevenly.
pub fn partition(area: Rect, device_count: usize, subunit_counts: &[usize]) -> PageLayout {
    let temperature = Rect::new(area.x, area.y, area.width, area.height.min(TEMPERATURE_ROWS));
    let device_rows = narrow(usize::from(area.height) * 2 / 3);
    let usable = device_rows.saturating_sub(TEMPERATURE_ROWS);
    let top = area.y + temperature.height;

    let content_x = area.x + area.width.min(1);
    let content_width = area.width.saturating_sub(2);

    let table_top = top + usable;
    let process_table = Rect::new(area.x, table_top, area.width, area.bottom() - table_top);

    if device_count == 0 {
        return PageLayout {
            temperature,
            devices: Vec::new(),
            placeholder: Some(Rect::new(content_x, top, content_width, usable.min(1))),
            process_table,
        };
    }

    let budget = narrow(usize::from(usable) / device_count);
    let devices = (0..device_count)
        .map(|idx| {
            let band_y = top + narrow(idx) * budget;
            let band = Rect::new(area.x, band_y, area.width, budget);

            let chart_rows = budget.saturating_sub(STATUS_ROWS + FREQUENCY_ROWS + BAND_MARGIN);
            let status_y = band_y + chart_rows;
            let status_rows = (budget - chart_rows).min(STATUS_ROWS);
            let freq_y = status_y + status_rows;
            let freq_rows = (budget - chart_rows - status_rows).min(FREQUENCY_ROWS);

            let chart = Rect::new(content_x, band_y, content_width, chart_rows);

            let slot = content_width / STATUS_FIELDS as u16;
            let status = std::array::from_fn(|field| {
                Rect::new(content_x + field as u16 * slot, status_y, slot, status_rows)
            });

            let count = subunit_counts.get(idx).copied().unwrap_or(0);
            let (frequency, subunits) = if count == 0 {
                (Rect::new(content_x, freq_y, content_width, freq_rows), Vec::new())
            } else {
                let share = usize::from(content_width) / (count + SUBUNIT_MARGIN);
                let main = Rect::new(
                    content_x,
                    freq_y,
                    narrow(share * SUBUNIT_MARGIN),
                    freq_rows,
                );
                let subunits = (0..count)
                    .map(|sub| {
                        let x = usize::from(content_x) + (SUBUNIT_MARGIN + sub) * share;
                        Rect::new(narrow(x), freq_y, narrow(share), freq_rows)
                    })
                    .collect();
                (main, subunits)
            };

            DeviceLayout {
                band,
                chart,
                status,
                frequency,
                subunits,
            }
        })
        .collect();

    PageLayout {
        temperature,
        devices,
        placeholder: None,
        process_table,
    }
}
