use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{self, LogConfig};

pub const LOG_ENV: &str = "GIF_TUI_LOG";

/// Installs a file-backed subscriber. The terminal belongs to the picker, so
/// nothing is written to stdout or stderr. Returns the log path in use.
pub fn init(cfg: &LogConfig) -> Result<PathBuf> {
    let path = cfg
        .file
        .clone()
        .or_else(config::default_log_path)
        .context("logging: unable to determine log file path")?;
    let file = open_log_file(&path)?;

    tracing_subscriber::registry()
        .with(filter(&cfg.level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("logging: subscriber already installed")?;

    Ok(path)
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("logging: failed to create {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("logging: failed to open {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("gif-tui.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn bad_level_falls_back() {
        // Must not panic on an unparsable directive.
        let _ = filter("=[not a directive");
    }
}
