//! Capture one snapshot from the configured source and write it as JSON,
//! ready to be replayed with `GPUSCOPE_SOURCE=file`.

use anyhow::{bail, Context, Result};
use gpuscope::collector::{start_collector, CollectorMessage};
use gpuscope::config::Config;
use std::fs::File;
use std::io::Write;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    let out = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "snapshot.json".to_string());
    let config = Config::from_env();
    let collector = start_collector(&config);

    let deadline = Instant::now() + WAIT;
    let snapshot = loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match collector.rx.recv_timeout(left) {
            Ok(CollectorMessage::Snapshot(snapshot)) => break snapshot,
            Ok(CollectorMessage::SourceLabel(label)) => println!("source: {label}"),
            Ok(CollectorMessage::Error(err)) => eprintln!("collector: {err}"),
            Err(_) => bail!("no snapshot within {}s", WAIT.as_secs()),
        }
    };

    let json = serde_json::to_string_pretty(&snapshot)?;
    let mut file = File::create(&out).with_context(|| format!("creating {out}"))?;
    file.write_all(json.as_bytes())?;
    println!("Wrote {out}");
    Ok(())
}
