use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{self, Config};
use crate::coordinator::{CoordinatorOptions, FeedCoordinator, ThreadRunner};
use crate::data::{FeedProvider, GiphyFeedProvider, MockFeedProvider};
use crate::giphy;
use crate::logging;
use crate::ui::{self, Outcome};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    /// Serve synthetic pages instead of calling GIPHY.
    pub demo: bool,
}

pub fn run(options: RunOptions) -> Result<Outcome> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let mut status = String::new();
    match logging::init(&cfg.log) {
        Ok(path) => info!(version = crate::VERSION, log = %path.display(), "gif-tui starting"),
        Err(err) => status = format!("Logging disabled: {err}"),
    }

    let provider: Arc<dyn FeedProvider> = if options.demo {
        status = join_status(status, "Demo mode: showing generated GIFs");
        Arc::new(MockFeedProvider::default())
    } else {
        if cfg.giphy.api_key.trim().is_empty() {
            let path = friendly_path(options.config_file.or_else(config::default_path).as_ref());
            warn!("no giphy api key configured");
            status = join_status(status, &format!("Set giphy.api_key in {path}"));
        }
        let client = giphy::Client::new(client_config(&cfg)).context("create giphy client")?;
        Arc::new(GiphyFeedProvider::new(Arc::new(client)))
    };

    let feed = FeedCoordinator::new(provider, Arc::new(ThreadRunner), coordinator_options(&cfg));
    let mut model = ui::Model::new(ui::Options {
        feed,
        column_width: cfg.ui.column_width,
        prefetch_rows: cfg.ui.prefetch_rows,
        status_message: status,
    });
    let outcome = model.run()?;

    match &outcome {
        Outcome::Selected(selection) => {
            info!(id = %selection.id, locator = %selection.locator, "picker finished")
        }
        Outcome::Cancelled => info!("picker cancelled"),
    }
    Ok(outcome)
}

fn client_config(cfg: &Config) -> giphy::ClientConfig {
    giphy::ClientConfig {
        api_key: Some(cfg.giphy.api_key.clone()),
        api_base: Some(cfg.giphy.api_base.clone()),
        user_agent: cfg.giphy.user_agent.clone(),
        timeout: Some(cfg.giphy.timeout),
        http_client: None,
    }
}

fn coordinator_options(cfg: &Config) -> CoordinatorOptions {
    CoordinatorOptions {
        page_limit: cfg.giphy.page_limit.max(1),
        rating: cfg.giphy.rating,
        max_bytes: cfg.feed.max_size_bytes,
        target_width: cfg.ui.column_width,
        search_debounce: cfg.feed.search_debounce,
        allow_paging: cfg.feed.allow_paging,
        animated: cfg.feed.animated,
    }
}

fn join_status(current: String, next: &str) -> String {
    if current.is_empty() {
        next.to_string()
    } else {
        format!("{current} · {next}")
    }
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/gif-tui/config.yaml".to_string()
    }
}
