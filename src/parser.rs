//! `tegrastats` output to [`TelemetrySnapshot`].
//!
//! Only the parts the GPU page shows are extracted: the timestamp, the
//! `GR3D_FREQ` engine and the `name@tempC` sensors.

use crate::format::Magnitude;
use crate::telemetry::{DeviceRecord, GpuFreq, GpuStatus, TelemetrySnapshot};
use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Name given to the integrated GPU reported by `GR3D_FREQ`.
pub const GPU_NAME: &str = "gpu";
/// Sensors that are powered down report this value.
const TEMP_OFFLINE: f32 = -256.0;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}-\d{2}-\d{4} \d{2}:\d{2}:\d{2}").unwrap());
static GR3D_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bGR3D(?:_FREQ)? (\d+)%(?:@(\[[\d,]+\]|\d+))?").unwrap());
static GR3D_OFF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bGR3D(?:_FREQ)? off\b").unwrap());
static TEMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\w+)@(-?[0-9.]+)C\b").unwrap());

pub fn parse_tegrastats(line: &str) -> Result<TelemetrySnapshot> {
    let mut payload = line.trim().to_string();
    if payload.is_empty() {
        bail!("empty tegrastats line");
    }

    let mut snapshot = TelemetrySnapshot::default();
    if let Some(mat) = DATE_RE.find(&payload) {
        snapshot.timestamp = Some(mat.as_str().trim().to_string());
        payload.replace_range(mat.range(), "");
    }

    snapshot.devices.extend(parse_gr3d(&payload));
    snapshot.temperatures = TEMP_RE
        .captures_iter(&payload)
        .filter_map(|caps| {
            let temp = caps[2].parse::<f32>().ok()?;
            (temp > TEMP_OFFLINE).then(|| (caps[1].to_string(), temp))
        })
        .collect();

    if snapshot.devices.is_empty() && snapshot.temperatures.is_empty() {
        bail!("no GPU or temperature fields in tegrastats line");
    }
    Ok(snapshot)
}

fn parse_gr3d(text: &str) -> Option<DeviceRecord> {
    if let Some(caps) = GR3D_RE.captures(text) {
        let load = caps[1].parse::<f64>().unwrap_or_default();
        let freq = caps.get(2).map(|m| parse_freq(m.as_str()));
        return Some(DeviceRecord {
            name: GPU_NAME.to_string(),
            status: Some(GpuStatus {
                load,
                ..Default::default()
            }),
            freq,
            power_control: None,
        });
    }
    // the engine is power gated: the device exists but reports nothing
    GR3D_OFF_RE.is_match(text).then(|| DeviceRecord {
        name: GPU_NAME.to_string(),
        ..Default::default()
    })
}

/// `1300` or `[305,305]`; a bracketed list carries one value per GPC.
fn parse_freq(raw: &str) -> GpuFreq {
    let subunits: Option<Vec<f64>> = raw
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(|list| {
            list.split(',')
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .collect()
        });
    let cur = match &subunits {
        Some(values) => values.iter().copied().fold(0.0, f64::max),
        None => raw.parse::<f64>().unwrap_or_default(),
    };
    GpuFreq {
        cur,
        unit: Magnitude::Mega,
        subunits: subunits.filter(|v| !v.is_empty()),
        ..Default::default()
    }
}
