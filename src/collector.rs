use crate::config::{Config, SourceMode};
use crate::format::Magnitude;
use crate::parser::parse_tegrastats;
use crate::processes::ProcessSampler;
use crate::telemetry::{DeviceRecord, GpuFreq, GpuStatus, TelemetrySnapshot};
use anyhow::{Context, Result};
use chrono::Local;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Processes attached to snapshots from local sources.
const PROCESS_LIMIT: usize = 64;
const SOCKET_RETRIES: usize = 5;
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum CollectorMessage {
    Snapshot(TelemetrySnapshot),
    SourceLabel(String),
    Error(String),
}

pub struct StatsCollector {
    pub rx: Receiver<CollectorMessage>,
}

pub fn start_collector(config: &Config) -> StatsCollector {
    let (tx, rx) = mpsc::channel();
    let config = config.clone();
    thread::spawn(move || {
        spawn_collection_loop(tx, &config);
    });
    StatsCollector { rx }
}

fn spawn_collection_loop(tx: Sender<CollectorMessage>, config: &Config) {
    let choice = select_source(config);
    info!(source = %choice.label, "collector started");
    let _ = tx.send(CollectorMessage::SourceLabel(choice.label.clone()));
    match choice.kind {
        SourceKind::Command(mut cmd) => {
            cmd.stdout(Stdio::piped());
            match cmd.spawn() {
                Ok(mut child) => {
                    let receiver_gone = stream_stats(&mut child, &tx);
                    stop_child(&mut child);
                    if receiver_gone {
                        return;
                    }
                    warn!("stats command ended, switching to synthetic data");
                }
                Err(err) => {
                    warn!("failed to start stats source ({cmd:?}): {err}");
                    let _ = tx.send(CollectorMessage::Error(format!("stats command: {err}")));
                }
            }
            run_synthetic(&tx, config);
        }
        SourceKind::Socket(path) => {
            let max_retries = if config.source == SourceMode::Socket {
                usize::MAX
            } else {
                SOCKET_RETRIES
            };
            let mut retry_count = 0;
            let mut backoff = config.interval;

            loop {
                match read_once_from_socket(&path) {
                    Ok(resp) => {
                        if let Some(snapshot) = resp.snapshot {
                            if tx.send(CollectorMessage::Snapshot(snapshot)).is_err() {
                                return;
                            }
                        }
                        let _ = tx.send(CollectorMessage::SourceLabel(resp.source));
                        retry_count = 0;
                        backoff = config.interval;
                    }
                    Err(err) => {
                        warn!(path = %path.display(), "socket read failed: {err:#}");
                        let _ = tx.send(CollectorMessage::Error(format!("socket error: {err:#}")));
                        retry_count += 1;
                        if retry_count >= max_retries {
                            run_synthetic(&tx, config);
                            return;
                        }
                        thread::sleep(backoff);
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
                thread::sleep(config.interval);
            }
        }
        SourceKind::File(path) => loop {
            let message = match read_snapshot_file(&path) {
                Ok(snapshot) => CollectorMessage::Snapshot(snapshot),
                Err(err) => {
                    warn!("{err:#}");
                    CollectorMessage::Error(format!("{err:#}"))
                }
            };
            if tx.send(message).is_err() {
                return;
            }
            thread::sleep(config.interval);
        },
        SourceKind::Synthetic => run_synthetic(&tx, config),
    }
}

struct SourceChoice {
    kind: SourceKind,
    label: String,
}

enum SourceKind {
    Command(Command),
    Socket(PathBuf),
    File(PathBuf),
    Synthetic,
}

/// Forward parsed lines from `child` until it ends. Returns `true` when the
/// receiving side hung up first.
fn stream_stats(child: &mut Child, tx: &Sender<CollectorMessage>) -> bool {
    let Some(stdout) = child.stdout.take() else {
        return false;
    };
    let mut sampler = ProcessSampler::new();
    for line in BufReader::new(stdout).lines().map_while(|line| line.ok()) {
        match parse_tegrastats(&line) {
            Ok(mut snapshot) => {
                snapshot.processes = sampler.top_processes(PROCESS_LIMIT);
                if tx.send(CollectorMessage::Snapshot(snapshot)).is_err() {
                    return true;
                }
            }
            Err(err) => debug!("skipping tegrastats line: {err:#}"),
        }
    }
    false
}

fn stop_child(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!("stats command already gone: {err}");
    }
    match child.wait() {
        Ok(status) => debug!(%status, "stats command reaped"),
        Err(err) => warn!("failed to reap stats command: {err}"),
    }
}

fn synthetic_choice(reason: &str) -> SourceChoice {
    SourceChoice {
        kind: SourceKind::Synthetic,
        label: format!("synthetic ({reason})"),
    }
}

fn socket_choice(path: &Path) -> SourceChoice {
    SourceChoice {
        kind: SourceKind::Socket(path.to_path_buf()),
        label: format!("socket {}", path.display()),
    }
}

fn select_source(config: &Config) -> SourceChoice {
    match config.source {
        SourceMode::Synthetic => synthetic_choice("requested"),
        SourceMode::Socket => socket_choice(&config.socket_path),
        SourceMode::File => match &config.snapshot_file {
            Some(path) => SourceChoice {
                kind: SourceKind::File(path.clone()),
                label: format!("file {}", path.display()),
            },
            None => synthetic_choice("GPUSCOPE_SNAPSHOT_FILE not set"),
        },
        SourceMode::Tegrastats => command_choice(config).unwrap_or_else(|| synthetic_choice("tegrastats missing")),
        SourceMode::Auto => {
            if config.socket_path.exists() {
                socket_choice(&config.socket_path)
            } else {
                command_choice(config).unwrap_or_else(|| synthetic_choice("no source found"))
            }
        }
    }
}

/// `GPUSCOPE_STATS_CMD` if set, otherwise the local `tegrastats` binary.
fn command_choice(config: &Config) -> Option<SourceChoice> {
    if let Some(raw_cmd) = &config.stats_cmd {
        let mut parts = raw_cmd.split_whitespace();
        if let Some(program) = parts.next() {
            let mut cmd = Command::new(program);
            cmd.args(parts);
            return Some(SourceChoice {
                kind: SourceKind::Command(cmd),
                label: format!("custom cmd: {raw_cmd}"),
            });
        }
    }

    let binary = which::which("tegrastats").ok()?;
    let mut cmd = Command::new(binary);
    cmd.arg("--interval").arg(config.interval.as_millis().to_string());
    Some(SourceChoice {
        kind: SourceKind::Command(cmd),
        label: "tegrastats".to_string(),
    })
}

fn run_synthetic(tx: &Sender<CollectorMessage>, config: &Config) {
    let _ = tx.send(CollectorMessage::SourceLabel("synthetic generator".to_string()));
    let mut sampler = ProcessSampler::new();
    let mut rng = rand::thread_rng();
    loop {
        let mut snapshot = synthesize_snapshot(&mut rng, config.synthetic_devices);
        snapshot.processes = sampler.top_processes(PROCESS_LIMIT);
        if tx.send(CollectorMessage::Snapshot(snapshot)).is_err() {
            debug!("ui went away, stopping synthetic source");
            return;
        }
        thread::sleep(config.interval);
    }
}

const SYNTHETIC_FREQS_KHZ: [f64; 5] = [306_000.0, 408_000.0, 624_750.0, 918_000.0, 1_300_500.0];

/// Plausible Orin-like readings; every device has two GPCs, either of which
/// may be power gated.
pub fn synthesize_snapshot(rng: &mut impl Rng, devices: usize) -> TelemetrySnapshot {
    let devices = (0..devices)
        .map(|idx| {
            let cur = SYNTHETIC_FREQS_KHZ[rng.gen_range(0..SYNTHETIC_FREQS_KHZ.len())];
            let gpcs = (0..2)
                .map(|_| if rng.gen_bool(0.85) { cur } else { 0.0 })
                .collect();
            DeviceRecord {
                name: if idx == 0 {
                    "gpu".to_string()
                } else {
                    format!("gpu{idx}")
                },
                status: Some(GpuStatus {
                    load: rng.gen_range(0.0..100.0),
                    railgate: rng.gen_bool(0.5),
                    scaling_3d: true,
                    tpc_pg_mask: false,
                }),
                freq: Some(GpuFreq {
                    cur,
                    unit: Magnitude::Kilo,
                    governor: "nvhost_podgov".to_string(),
                    min: SYNTHETIC_FREQS_KHZ.first().copied(),
                    max: SYNTHETIC_FREQS_KHZ.last().copied(),
                    subunits: Some(gpcs),
                }),
                power_control: Some("auto".to_string()),
            }
        })
        .collect();

    let temperatures = ["gpu", "cpu", "soc0", "tj"]
        .iter()
        .map(|name| (name.to_string(), rng.gen_range(35.0..75.0)))
        .collect();

    TelemetrySnapshot {
        timestamp: Some(Local::now().format("%m-%d-%Y %H:%M:%S").to_string()),
        devices,
        temperatures,
        processes: Vec::new(),
    }
}

#[derive(Serialize, Deserialize)]
struct SocketResponse {
    source: String,
    #[serde(default, alias = "stats")]
    snapshot: Option<TelemetrySnapshot>,
}

fn read_once_from_socket(path: &Path) -> Result<SocketResponse> {
    let mut stream = UnixStream::connect(path)
        .with_context(|| format!("connecting to {}", path.display()))?;
    let mut buf = String::new();
    stream.read_to_string(&mut buf)?;
    let resp: SocketResponse = serde_json::from_str(&buf).context("decoding socket response")?;
    Ok(resp)
}

pub fn read_snapshot_file(path: &Path) -> Result<TelemetrySnapshot> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    TelemetrySnapshot::from_json(&raw).with_context(|| format!("in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;
    use std::os::unix::net::UnixListener;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gpuscope-{}-{name}", std::process::id()))
    }

    #[test]
    fn synthetic_snapshots_are_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let snapshot = synthesize_snapshot(&mut rng, 2);
            assert_eq!(snapshot.device_keys(), vec!["gpu", "gpu1"]);
            for device in &snapshot.devices {
                let load = device.load().unwrap();
                assert!((0.0..100.0).contains(&load));
                assert_eq!(device.subunits().len(), 2);
                let freq = device.freq.as_ref().unwrap();
                assert!(freq.min <= Some(freq.cur) && Some(freq.cur) <= freq.max);
            }
            assert_eq!(snapshot.gpu_temperatures().count(), 1);
        }
    }

    #[test]
    fn explicit_modes_pick_their_source() {
        let cfg = Config {
            source: SourceMode::File,
            snapshot_file: Some(PathBuf::from("/tmp/x.json")),
            ..Config::default()
        };
        assert!(matches!(select_source(&cfg).kind, SourceKind::File(_)));

        let cfg = Config {
            source: SourceMode::File,
            ..Config::default()
        };
        assert!(matches!(select_source(&cfg).kind, SourceKind::Synthetic));

        let cfg = Config {
            source: SourceMode::Tegrastats,
            stats_cmd: Some("cat /tmp/tegrastats.log".into()),
            ..Config::default()
        };
        let choice = select_source(&cfg);
        assert!(matches!(choice.kind, SourceKind::Command(_)));
        assert_eq!(choice.label, "custom cmd: cat /tmp/tegrastats.log");
    }

    #[test]
    fn auto_prefers_an_existing_socket() {
        let path = temp_path("auto.sock");
        let _ = fs::remove_file(&path);
        let _listener = UnixListener::bind(&path).unwrap();
        let cfg = Config {
            socket_path: path.clone(),
            ..Config::default()
        };
        assert!(matches!(select_source(&cfg).kind, SourceKind::Socket(_)));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn reads_a_snapshot_over_the_socket() {
        let path = temp_path("read.sock");
        let _ = fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .write_all(br#"{"source":"tegrastats","stats":{"gpu":[{"name":"ga10b","status":{"load":12}}]}}"#)
                .unwrap();
        });

        let resp = read_once_from_socket(&path).unwrap();
        server.join().unwrap();
        assert_eq!(resp.source, "tegrastats");
        let snapshot = resp.snapshot.unwrap();
        assert_eq!(snapshot.devices[0].load(), Some(12.0));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn snapshot_file_errors_carry_the_path() {
        let path = temp_path("bad.json");
        fs::write(&path, "{").unwrap();
        let err = read_snapshot_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"));
        let _ = fs::remove_file(&path);

        let missing = read_snapshot_file(Path::new("/nonexistent/gpuscope.json")).unwrap_err();
        assert!(format!("{missing:#}").contains("reading /nonexistent/gpuscope.json"));
    }

    #[test]
    fn stats_command_is_reaped_when_the_receiver_hangs_up() {
        let mut child = Command::new("sh")
            .args(["-c", "while true; do echo 'GR3D_FREQ 12% gpu@41C'; sleep 0.05; done"])
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let (tx, rx) = mpsc::channel();
        drop(rx);

        assert!(stream_stats(&mut child, &tx));
        stop_child(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn finished_stats_command_is_not_a_hang_up() {
        let mut child = Command::new("sh")
            .args(["-c", "echo 'GR3D_FREQ 12% gpu@41C'; echo 'garbage'"])
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let (tx, rx) = mpsc::channel();

        assert!(!stream_stats(&mut child, &tx));
        stop_child(&mut child);
        let loads: Vec<_> = rx
            .try_iter()
            .filter_map(|msg| match msg {
                CollectorMessage::Snapshot(snapshot) => snapshot.devices[0].load(),
                _ => None,
            })
            .collect();
        assert_eq!(loads, vec![12.0]);
    }

    #[test]
    fn file_source_streams_snapshots() {
        let path = temp_path("stream.json");
        fs::write(&path, r#"{"devices":[{"name":"gpu","status":{"load":40}}]}"#).unwrap();
        let cfg = Config {
            source: SourceMode::File,
            snapshot_file: Some(path.clone()),
            interval: Duration::from_millis(10),
            ..Config::default()
        };
        let collector = start_collector(&cfg);
        let mut got = None;
        for _ in 0..5 {
            match collector.rx.recv_timeout(Duration::from_secs(2)) {
                Ok(CollectorMessage::Snapshot(snapshot)) => {
                    got = Some(snapshot);
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        assert_eq!(got.and_then(|s| s.devices[0].load()), Some(40.0));
        let _ = fs::remove_file(&path);
    }
}
