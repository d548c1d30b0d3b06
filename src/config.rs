use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/jetsonscope.sock";
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_HISTORY: usize = 256;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// socket if present, else tegrastats if installed, else synthetic
    Auto,
    Synthetic,
    Tegrastats,
    Socket,
    File,
}

impl SourceMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Some(SourceMode::Auto),
            "synthetic" | "fake" | "dummy" => Some(SourceMode::Synthetic),
            "tegrastats" | "command" | "cmd" => Some(SourceMode::Tegrastats),
            "socket" => Some(SourceMode::Socket),
            "file" => Some(SourceMode::File),
            _ => None,
        }
    }
}

/// Runtime settings, read from `GPUSCOPE_*` variables (socket path also
/// honours the older `JETSONSCOPE_SOCKET_PATH`). Bad values fall back to
/// the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source: SourceMode,
    pub socket_path: PathBuf,
    pub snapshot_file: Option<PathBuf>,
    pub stats_cmd: Option<String>,
    pub interval: Duration,
    pub history: usize,
    pub synthetic_devices: usize,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let source = non_empty("GPUSCOPE_SOURCE")
            .and_then(|raw| SourceMode::parse(&raw))
            .unwrap_or(SourceMode::Auto);
        let socket_path = non_empty("GPUSCOPE_SOCKET_PATH")
            .or_else(|| non_empty("JETSONSCOPE_SOCKET_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH));
        let interval_ms = non_empty("GPUSCOPE_INTERVAL_MS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_INTERVAL_MS);
        let history = non_empty("GPUSCOPE_HISTORY")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_HISTORY);
        let synthetic_devices = non_empty("GPUSCOPE_DEVICES")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(1);

        Self {
            source,
            socket_path,
            snapshot_file: non_empty("GPUSCOPE_SNAPSHOT_FILE").map(PathBuf::from),
            stats_cmd: non_empty("GPUSCOPE_STATS_CMD"),
            interval: Duration::from_millis(interval_ms),
            history,
            synthetic_devices,
            log_file: non_empty("GPUSCOPE_LOG").map(PathBuf::from),
            log_level: non_empty("GPUSCOPE_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.source, SourceMode::Auto);
        assert_eq!(cfg.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
        assert_eq!(cfg.interval, Duration::from_millis(1000));
        assert_eq!(cfg.history, 256);
        assert_eq!(cfg.synthetic_devices, 1);
        assert!(cfg.log_file.is_none());
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("GPUSCOPE_SOURCE", "File"),
            ("GPUSCOPE_SNAPSHOT_FILE", "/tmp/snap.json"),
            ("GPUSCOPE_INTERVAL_MS", "250"),
            ("GPUSCOPE_HISTORY", "64"),
            ("GPUSCOPE_DEVICES", "3"),
            ("GPUSCOPE_LOG", "/tmp/gpuscope.log"),
            ("GPUSCOPE_LOG_LEVEL", "gpuscope=debug"),
        ]);
        assert_eq!(cfg.source, SourceMode::File);
        assert_eq!(cfg.snapshot_file, Some(PathBuf::from("/tmp/snap.json")));
        assert_eq!(cfg.interval, Duration::from_millis(250));
        assert_eq!(cfg.history, 64);
        assert_eq!(cfg.synthetic_devices, 3);
        assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/gpuscope.log")));
        assert_eq!(cfg.log_level, "gpuscope=debug");
    }

    #[test]
    fn socket_path_falls_back_to_legacy_variable() {
        let cfg = config(&[("JETSONSCOPE_SOCKET_PATH", "/run/js.sock")]);
        assert_eq!(cfg.socket_path, PathBuf::from("/run/js.sock"));
        let cfg = config(&[
            ("JETSONSCOPE_SOCKET_PATH", "/run/js.sock"),
            ("GPUSCOPE_SOCKET_PATH", "/run/gs.sock"),
        ]);
        assert_eq!(cfg.socket_path, PathBuf::from("/run/gs.sock"));
    }

    #[test]
    fn invalid_values_use_defaults() {
        let cfg = config(&[
            ("GPUSCOPE_SOURCE", "carrier-pigeon"),
            ("GPUSCOPE_INTERVAL_MS", "0"),
            ("GPUSCOPE_HISTORY", "lots"),
            ("GPUSCOPE_LOG", "  "),
        ]);
        assert_eq!(cfg.source, SourceMode::Auto);
        assert_eq!(cfg.interval, Duration::from_millis(DEFAULT_INTERVAL_MS));
        assert_eq!(cfg.history, DEFAULT_HISTORY);
        assert!(cfg.log_file.is_none());
    }
}
