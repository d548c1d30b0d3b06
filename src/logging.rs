//! File logging. The terminal belongs to the UI, so events only go anywhere
//! when `GPUSCOPE_LOG` names a file.

use crate::config::{Config, DEFAULT_LOG_LEVEL};
use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Returns `false` when logging is off.
pub fn init(config: &Config) -> Result<bool> {
    let Some(path) = &config.log_file else {
        return Ok(false);
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter(&config.log_level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("installing log subscriber: {err}"))?;
    Ok(true)
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_a_file() {
        assert!(!init(&Config::default()).unwrap());
    }

    #[test]
    fn unopenable_file_is_an_error() {
        let config = Config {
            log_file: Some("/nonexistent/dir/gpuscope.log".into()),
            ..Config::default()
        };
        let err = init(&config).unwrap_err();
        assert!(format!("{err:#}").contains("opening log file"));
    }

    #[test]
    fn bad_directives_fall_back_to_the_default_level() {
        assert_eq!(
            filter("gpuscope=loud").to_string(),
            EnvFilter::new(DEFAULT_LOG_LEVEL).to_string()
        );
    }
}
