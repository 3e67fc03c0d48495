use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use url::Url;

use crate::feed::{LaneKind, Page, PageMetadata};
use crate::giphy::{self, Rating};
use crate::media::{MediaItem, MediaVariant, Rendition, VariantKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub lane: LaneKind,
    pub query: Option<String>,
    pub offset: u32,
    pub limit: u32,
    pub rating: Rating,
}

/// Source of feed pages. Calls block; the coordinator runs them off its
/// control thread.
pub trait FeedProvider: Send + Sync {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page>;
}

pub struct GiphyFeedProvider {
    client: Arc<giphy::Client>,
}

impl GiphyFeedProvider {
    pub fn new(client: Arc<giphy::Client>) -> Self {
        Self { client }
    }
}

impl FeedProvider for GiphyFeedProvider {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        match (request.lane, request.query.as_deref()) {
            (LaneKind::Trending, _) => self
                .client
                .trending(request.offset, request.limit, request.rating)
                .context("fetch trending"),
            (LaneKind::Search, Some(query)) => self
                .client
                .search(query, request.offset, request.limit, request.rating)
                .context("fetch search results"),
            (LaneKind::Search, None) => Err(anyhow!("search request without a query")),
        }
    }
}

/// Offline provider producing synthetic pages; records every request.
pub struct MockFeedProvider {
    total: u32,
    requests: Mutex<Vec<PageRequest>>,
    failure: Mutex<Option<String>>,
}

impl Default for MockFeedProvider {
    fn default() -> Self {
        Self::new(500)
    }
}

impl MockFeedProvider {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            requests: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Makes every following call fail with `message` until cleared.
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }
}

impl FeedProvider for MockFeedProvider {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        self.requests.lock().push(request.clone());
        if let Some(message) = self.failure.lock().clone() {
            return Err(anyhow!(message));
        }

        let start = request.offset.min(self.total);
        let end = start.saturating_add(request.limit).min(self.total);
        let prefix = match (request.lane, request.query.as_deref()) {
            (LaneKind::Trending, _) => "trending".to_string(),
            (LaneKind::Search, Some(query)) => query.replace(char::is_whitespace, "-"),
            (LaneKind::Search, None) => "search".to_string(),
        };
        let items = (start..end).map(|n| mock_item(&prefix, n)).collect();

        Ok(Page {
            items,
            pagination: PageMetadata::new(start, end - start, self.total),
        })
    }
}

fn mock_item(prefix: &str, n: u32) -> MediaItem {
    let variant = |width: u32, size: u64, kind: VariantKind| {
        let locator = Url::parse(&format!(
            "https://media.example.com/{prefix}/{n}/{width}.{}",
            kind.label()
        ))
        .ok()?;
        Some(MediaVariant::new(locator, width, width * 3 / 4, size, kind))
    };
    let small = 40_000 + u64::from(n % 7) * 9_000;
    MediaItem::new(
        format!("{prefix}-{n}"),
        format!("{prefix} #{n}"),
        vec![
            Rendition {
                name: "fixed_width".into(),
                still: variant(200, small, VariantKind::Still),
                video: variant(200, small / 4, VariantKind::Video),
                webp: variant(200, small / 2, VariantKind::Webp),
            },
            Rendition {
                name: "original".into(),
                still: variant(480, small * 40, VariantKind::Still),
                video: variant(480, small * 6, VariantKind::Video),
                webp: None,
            },
        ],
    )
}
