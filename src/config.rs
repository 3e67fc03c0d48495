use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::giphy::{self, Rating};

const DEFAULT_ENV_PREFIX: &str = "GIF_TUI";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub giphy: GiphyConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GiphyConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for GiphyConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            rating: Rating::default(),
            page_limit: default_page_limit(),
            timeout: default_timeout(),
        }
    }
}

fn default_api_base() -> String {
    giphy::DEFAULT_API_BASE.to_string()
}

fn default_user_agent() -> String {
    format!("gif-tui/{}", crate::VERSION)
}

fn default_page_limit() -> u32 {
    100
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
    #[serde(default = "default_search_debounce", with = "humantime_serde")]
    pub search_debounce: Duration,
    #[serde(default = "default_true")]
    pub allow_paging: bool,
    #[serde(default = "default_true")]
    pub animated: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            search_debounce: default_search_debounce(),
            allow_paging: true,
            animated: true,
        }
    }
}

fn default_max_size_bytes() -> u64 {
    2_048_000
}

fn default_search_debounce() -> Duration {
    Duration::from_millis(500)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_column_width")]
    pub column_width: u32,
    #[serde(default = "default_prefetch_rows")]
    pub prefetch_rows: usize,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            column_width: default_column_width(),
            prefetch_rows: default_prefetch_rows(),
        }
    }
}

fn default_column_width() -> u32 {
    200
}

fn default_prefetch_rows() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

/// Reads the YAML file (explicit path or the default location) and layers
/// environment overrides on top. A missing file is not an error.
pub fn load(options: LoadOptions) -> Result<Config> {
    let path = options.config_file.or_else(default_config_path);
    let mut cfg = match path {
        Some(path) if path.exists() => read_config_file(&path)?,
        _ => Config::default(),
    };

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    for (key, value) in load_env(prefix) {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("config: failed to read {}", path.display()))?;
    // An empty file deserializes to unit, not a mapping.
    if data.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("config: failed to parse {}", path.display()))?;
    Ok(config)
}

fn load_env(prefix: &str) -> HashMap<String, String> {
    let upper_prefix = format!("{}_", prefix.to_uppercase());
    env::vars()
        .filter_map(|(key, value)| {
            key.strip_prefix(&upper_prefix)
                .map(|stripped| (stripped.to_ascii_lowercase().replace("__", "."), value))
        })
        .collect()
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "giphy.api_key" => cfg.giphy.api_key = value,
        "giphy.api_base" => cfg.giphy.api_base = value,
        "giphy.user_agent" => cfg.giphy.user_agent = value,
        "giphy.rating" => {
            if let Some(rating) = Rating::from_key(&value) {
                cfg.giphy.rating = rating;
            }
        }
        "giphy.page_limit" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.giphy.page_limit = parsed;
            }
        }
        "giphy.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.giphy.timeout = duration;
            }
        }
        "feed.max_size_bytes" => {
            if let Ok(parsed) = value.parse::<u64>() {
                cfg.feed.max_size_bytes = parsed;
            }
        }
        "feed.search_debounce" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.search_debounce = duration;
            }
        }
        "feed.allow_paging" => cfg.feed.allow_paging = parse_flag(&value),
        "feed.animated" => cfg.feed.animated = parse_flag(&value),
        "ui.column_width" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.ui.column_width = parsed;
            }
        }
        "ui.prefetch_rows" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.ui.prefetch_rows = parsed;
            }
        }
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gif-tui").join("config.yaml"))
}

pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("gif-tui").join("gif-tui.log"))
}
