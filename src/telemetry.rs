use crate::format::Magnitude;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Power/activity flags of one accelerator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuStatus {
    /// Load in percent, 0-100.
    pub load: f64,
    #[serde(default)]
    pub railgate: bool,
    #[serde(default, rename = "3d_scaling", alias = "scaling3d")]
    pub scaling_3d: bool,
    #[serde(default)]
    pub tpc_pg_mask: bool,
}

/// Frequency table of one accelerator. All values share `unit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuFreq {
    pub cur: f64,
    #[serde(default)]
    pub unit: Magnitude,
    #[serde(default)]
    pub governor: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Per-GPC frequencies; 0 means the sub-unit is powered off.
    #[serde(default, alias = "GPC", skip_serializing_if = "Option::is_none")]
    pub subunits: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    #[serde(default)]
    pub status: Option<GpuStatus>,
    #[serde(default)]
    pub freq: Option<GpuFreq>,
    #[serde(default)]
    pub power_control: Option<String>,
}

impl DeviceRecord {
    pub fn load(&self) -> Option<f64> {
        self.status.as_ref().map(|s| s.load)
    }

    /// Sub-unit frequencies, empty when the collector reported none.
    pub fn subunits(&self) -> &[f64] {
        self.freq
            .as_ref()
            .and_then(|f| f.subunits.as_deref())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    #[serde(default)]
    pub user: Option<String>,
    pub name: String,
    #[serde(default)]
    pub cpu_percent: f32,
    #[serde(default)]
    pub memory_kb: u64,
    #[serde(default)]
    pub gpu_memory_kb: Option<u64>,
    #[serde(default)]
    pub threads: Option<usize>,
}

/// One frame of telemetry. Device order is the device index and is
/// expected to stay stable between frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "gpu")]
    pub devices: Vec<DeviceRecord>,
    /// Sensor name to degrees Celsius.
    #[serde(default, alias = "temperature")]
    pub temperatures: BTreeMap<String, f32>,
    #[serde(default)]
    pub processes: Vec<ProcessEntry>,
}

impl TelemetrySnapshot {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("decoding telemetry snapshot")
    }

    pub fn subunit_counts(&self) -> Vec<usize> {
        self.devices.iter().map(|d| d.subunits().len()).collect()
    }

    /// Stable identity for every device, in index order. Repeated names get
    /// a `#n` suffix so two devices never share an identity.
    pub fn device_keys(&self) -> Vec<String> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        self.devices
            .iter()
            .map(|device| {
                let count = seen.entry(device.name.as_str()).or_insert(0);
                let key = if *count == 0 {
                    device.name.clone()
                } else {
                    format!("{}#{}", device.name, count)
                };
                *count += 1;
                key
            })
            .collect()
    }

    /// Temperatures of GPU sensors (name contains "gpu", any case), by name.
    pub fn gpu_temperatures(&self) -> impl Iterator<Item = (&str, f32)> {
        self.temperatures
            .iter()
            .filter(|(name, _)| name.to_ascii_lowercase().contains("gpu"))
            .map(|(name, temp)| (name.as_str(), *temp))
    }
}
