use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::feed::{Page, PageMetadata};
use crate::media::{parse_count, parse_dimension, MediaItem, MediaVariant, Rendition, VariantKind};

pub const DEFAULT_API_BASE: &str = "https://api.giphy.com/v1/gifs/";
pub const PUBLIC_BETA_KEY: &str = "dc6zaTOxFJmzC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
pub enum Rating {
    #[serde(rename = "y")]
    Y,
    #[serde(rename = "g")]
    G,
    #[serde(rename = "pg")]
    Pg,
    #[default]
    #[serde(rename = "pg-13")]
    Pg13,
    #[serde(rename = "r")]
    R,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Y => "y",
            Rating::G => "g",
            Rating::Pg => "pg",
            Rating::Pg13 => "pg-13",
            Rating::R => "r",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "y" => Some(Rating::Y),
            "g" => Some(Rating::G),
            "pg" => Some(Rating::Pg),
            "pg-13" | "pg13" => Some(Rating::Pg13),
            "r" => Some(Rating::R),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GiphyError {
    #[error("You need to set your Giphy API key before searching.")]
    MissingApiKey,
    #[error("giphy: api error {status}{}", body_snippet(.body))]
    Status { status: u16, body: String },
    #[error("The server returned an unknown response.")]
    Decode(#[source] serde_json::Error),
}

const SNIPPET_CHARS: usize = 80;

/// First line of an error body for display; markup pages are left out.
fn body_snippet(body: &str) -> String {
    let line = body.trim().lines().next().unwrap_or("").trim();
    if line.is_empty() || line.starts_with('<') {
        return String::new();
    }
    let mut snippet: String = line.chars().take(SNIPPET_CHARS).collect();
    if line.chars().count() > SNIPPET_CHARS {
        snippet.push('…');
    }
    format!(": {snippet}")
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    api_key: Option<String>,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base = config
            .api_base
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let mut base_url = Url::parse(base.trim()).context("giphy: invalid api base")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let api_key = config
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        if api_key.as_deref() == Some(PUBLIC_BETA_KEY) {
            warn!("using Giphy's public beta key; switch to a production key before shipping");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()
                .context("giphy: build http client")?,
        };

        Ok(Client {
            http,
            api_key,
            user_agent: config.user_agent,
            base_url,
        })
    }

    fn uses_default_base(&self) -> bool {
        self.base_url.as_str() == DEFAULT_API_BASE
    }

    pub fn trending(&self, offset: u32, limit: u32, rating: Rating) -> Result<Page> {
        self.fetch("trending", None, offset, limit, rating)
    }

    pub fn search(&self, query: &str, offset: u32, limit: u32, rating: Rating) -> Result<Page> {
        self.fetch("search", Some(query), offset, limit, rating)
    }

    fn fetch(
        &self,
        path: &str,
        query: Option<&str>,
        offset: u32,
        limit: u32,
        rating: Rating,
    ) -> Result<Page> {
        if self.api_key.is_none() && self.uses_default_base() {
            return Err(GiphyError::MissingApiKey.into());
        }

        let mut url = self.base_url.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(key) = &self.api_key {
                pairs.append_pair("api_key", key);
            }
            if let Some(q) = query {
                pairs.append_pair("q", q);
            }
            pairs.append_pair("limit", &limit.to_string());
            pairs.append_pair("rating", rating.as_str());
            pairs.append_pair("offset", &offset.to_string());
        }

        let started = std::time::Instant::now();
        let mut req = self.http.get(url.clone());
        if !self.user_agent.trim().is_empty() {
            req = req.header(USER_AGENT, self.user_agent.clone());
        }
        let resp = req.send().context("giphy: request failed")?;
        let status = resp.status();
        let body = resp.text().context("giphy: read body")?;
        debug!(
            path,
            offset,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "giphy request completed"
        );

        if !status.is_success() {
            debug!(status = status.as_u16(), body = %body, "giphy error response");
            return Err(GiphyError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        decode_page(&body)
    }
}

#[derive(Debug, Deserialize, Default)]
struct Envelope {
    #[serde(default)]
    data: Vec<WireGif>,
    #[serde(default)]
    pagination: Option<WirePagination>,
}

#[derive(Debug, Deserialize)]
struct WireGif {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    images: BTreeMap<String, WireImageSet>,
}

#[derive(Debug, Deserialize, Default)]
struct WireImageSet {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    width: Option<Value>,
    #[serde(default)]
    height: Option<Value>,
    #[serde(default)]
    size: Option<Value>,
    #[serde(default)]
    mp4: Option<String>,
    #[serde(default)]
    mp4_size: Option<Value>,
    #[serde(default)]
    webp: Option<String>,
    #[serde(default)]
    webp_size: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
struct WirePagination {
    #[serde(default)]
    offset: Option<Value>,
    #[serde(default)]
    count: Option<Value>,
    #[serde(default)]
    total_count: Option<Value>,
}

/// Decodes a provider payload. A bare array is accepted as the item list.
pub fn decode_page(body: &str) -> Result<Page> {
    let value: Value = serde_json::from_str(body).map_err(GiphyError::Decode)?;
    let envelope: Envelope = if value.is_array() {
        Envelope {
            data: serde_json::from_value(value).map_err(GiphyError::Decode)?,
            pagination: None,
        }
    } else {
        serde_json::from_value(value).map_err(GiphyError::Decode)?
    };

    let items = envelope
        .data
        .into_iter()
        .filter(|gif| !gif.id.is_empty())
        .map(into_item)
        .collect();
    let pagination = envelope
        .pagination
        .map(|p| PageMetadata {
            offset: opt_u32(p.offset.as_ref()),
            count: opt_u32(p.count.as_ref()),
            total: opt_u32(p.total_count.as_ref()),
        })
        .unwrap_or_default();

    Ok(Page { items, pagination })
}

fn into_item(gif: WireGif) -> MediaItem {
    let renditions = gif
        .images
        .into_iter()
        .map(|(name, set)| into_rendition(name, set))
        .collect();
    MediaItem::new(gif.id, gif.title, renditions)
}

fn into_rendition(name: String, set: WireImageSet) -> Rendition {
    let width = lenient_dimension(set.width.as_ref());
    let height = lenient_dimension(set.height.as_ref());
    let variant = |raw: Option<&String>, size: Option<&Value>, kind: VariantKind| {
        let locator = Url::parse(raw?.trim()).ok()?;
        Some(MediaVariant::new(
            locator,
            width,
            height,
            lenient_count(size),
            kind,
        ))
    };
    Rendition {
        still: variant(set.url.as_ref(), set.size.as_ref(), VariantKind::Still),
        video: variant(set.mp4.as_ref(), set.mp4_size.as_ref(), VariantKind::Video),
        webp: variant(set.webp.as_ref(), set.webp_size.as_ref(), VariantKind::Webp),
        name,
    }
}

fn lenient_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::String(raw)) => parse_count(raw),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

fn lenient_dimension(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::String(raw)) => parse_dimension(raw),
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
        _ => 0,
    }
}

fn opt_u32(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::String(raw) => raw.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": [
            {
                "id": "abc",
                "title": "Cat GIF",
                "images": {
                    "fixed_width": {
                        "url": "https://media.giphy.com/abc/200w.gif",
                        "width": "200",
                        "height": "150",
                        "size": "48213",
                        "mp4": "https://media.giphy.com/abc/200w.mp4",
                        "mp4_size": "12000",
                        "webp": "https://media.giphy.com/abc/200w.webp",
                        "webp_size": "oops"
                    },
                    "original": {
                        "url": "https://media.giphy.com/abc/giphy.gif",
                        "width": 480,
                        "height": "360"
                    },
                    "broken": {
                        "width": "10"
                    }
                }
            },
            { "title": "no id" }
        ],
        "pagination": { "total_count": 5000, "count": "1", "offset": 25 }
    }"#;

    #[test]
    fn decodes_items_and_pagination() {
        let page = decode_page(SAMPLE).unwrap();
        assert_eq!(page.items.len(), 1);
        let item = &page.items[0];
        assert_eq!(item.id(), "abc");
        assert_eq!(item.title(), "Cat GIF");
        // "broken" has no locator and is dropped.
        assert_eq!(item.renditions().len(), 2);

        let fixed = item
            .renditions()
            .iter()
            .find(|r| r.name == "fixed_width")
            .unwrap();
        let still = fixed.still.as_ref().unwrap();
        assert_eq!((still.width, still.height, still.byte_size), (200, 150, 48213));
        assert_eq!(fixed.video.as_ref().unwrap().byte_size, 12000);
        assert_eq!(fixed.webp.as_ref().unwrap().byte_size, 0);

        let original = item
            .renditions()
            .iter()
            .find(|r| r.name == "original")
            .unwrap();
        let still = original.still.as_ref().unwrap();
        assert_eq!((still.width, still.height, still.byte_size), (480, 360, 0));

        assert_eq!(page.pagination, PageMetadata::new(25, 1, 5000));
    }

    #[test]
    fn root_array_is_accepted() {
        let page = decode_page(r#"[{"id": "x", "images": {}}]"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination, PageMetadata::default());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_page("<html>").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GiphyError>(),
            Some(GiphyError::Decode(_))
        ));
    }

    #[test]
    fn default_base_requires_api_key() {
        let client = Client::new(ClientConfig {
            user_agent: "gif-tui/test".into(),
            ..Default::default()
        })
        .unwrap();
        let err = client.trending(0, 10, Rating::G).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GiphyError>(),
            Some(GiphyError::MissingApiKey)
        ));
    }

    #[test]
    fn custom_base_gets_trailing_slash() {
        let client = Client::new(ClientConfig {
            api_base: Some("https://proxy.example.com/gifs".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url.as_str(), "https://proxy.example.com/gifs/");
        assert!(!client.uses_default_base());
    }

    #[test]
    fn rating_keys_round_trip() {
        for rating in [Rating::Y, Rating::G, Rating::Pg, Rating::Pg13, Rating::R] {
            assert_eq!(Rating::from_key(rating.as_str()), Some(rating));
        }
        assert_eq!(Rating::from_key("nc-17"), None);
    }

    #[test]
    fn status_error_hides_markup_bodies() {
        let html = GiphyError::Status {
            status: 502,
            body: "<!DOCTYPE html>\n<html><body>Bad gateway</body></html>".into(),
        };
        assert_eq!(html.to_string(), "giphy: api error 502");

        let json = GiphyError::Status {
            status: 403,
            body: format!("{{\"message\": \"Invalid authentication credentials\"}}{}", "x".repeat(200)),
        };
        let text = json.to_string();
        assert!(text.starts_with("giphy: api error 403: {\"message\""));
        assert!(text.ends_with('…'));
        assert!(text.chars().count() < 120);
    }
}
