use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FeedError, Result};

const OEMBED_URL: &str = "https://www.youtube.com/oembed";
const WATCH_URL: &str = "https://www.youtube.com/watch";
const OEMBED_TIMEOUT: Duration = Duration::from_secs(10);
const WATCH_PAGE_TIMEOUT: Duration = Duration::from_secs(15);
const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
const BROWSER_LANG: &str = "en-US,en;q=0.9";

static VIEW_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""viewCount":"(\d+)""#).unwrap());
static PUBLISH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""publishDate":"([^"]+)""#).unwrap());

/// Video fields carried on every record. Each one is filled independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(rename = "ytTitle")]
    pub title: Option<String>,
    #[serde(rename = "ytChannel")]
    pub channel_name: Option<String>,
    #[serde(rename = "ytChannelUrl")]
    pub channel_url: Option<String>,
    #[serde(rename = "ytViews")]
    pub view_count: Option<u64>,
    #[serde(rename = "ytPublished")]
    pub publish_date: Option<String>,
}

impl VideoMetadata {
    /// Field-wise merge; fields already set on `self` are kept.
    pub fn or(self, other: VideoMetadata) -> VideoMetadata {
        VideoMetadata {
            title: self.title.or(other.title),
            channel_name: self.channel_name.or(other.channel_name),
            channel_url: self.channel_url.or(other.channel_url),
            view_count: self.view_count.or(other.view_count),
            publish_date: self.publish_date.or(other.publish_date),
        }
    }
}

/// Subset of the oEmbed response we use.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OEmbed {
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
}

/// The two public lookups available for a video id.
pub trait VideoSource {
    fn oembed(&self, video_id: &str) -> Result<OEmbed>;
    fn watch_page(&self, video_id: &str) -> Result<String>;
}

pub struct YoutubeClient {
    http: Client,
}

impl YoutubeClient {
    pub fn new() -> Result<Self> {
        Ok(YoutubeClient {
            http: Client::builder().build()?,
        })
    }
}

fn watch_url(video_id: &str) -> String {
    format!("{}?v={}", WATCH_URL, video_id)
}

impl VideoSource for YoutubeClient {
    fn oembed(&self, video_id: &str) -> Result<OEmbed> {
        let target = watch_url(video_id);
        let resp = self
            .http
            .get(OEMBED_URL)
            .query(&[("url", target.as_str()), ("format", "json")])
            .timeout(OEMBED_TIMEOUT)
            .send()?;
        if resp.status() != StatusCode::OK {
            return Err(FeedError::Status {
                status: resp.status().as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp.json()?)
    }

    fn watch_page(&self, video_id: &str) -> Result<String> {
        let resp = self
            .http
            .get(watch_url(video_id))
            .header(USER_AGENT, BROWSER_UA)
            .header(ACCEPT_LANGUAGE, BROWSER_LANG)
            .timeout(WATCH_PAGE_TIMEOUT)
            .send()?;
        Ok(resp.text()?)
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

pub fn metadata_from_oembed(o: OEmbed) -> VideoMetadata {
    VideoMetadata {
        title: non_empty(o.title),
        channel_name: non_empty(o.author_name),
        channel_url: non_empty(o.author_url),
        ..Default::default()
    }
}

/// View count and publish date (first 10 chars, `YYYY-MM-DD`) from raw page text.
pub fn metadata_from_watch_page(html: &str) -> VideoMetadata {
    VideoMetadata {
        view_count: VIEW_COUNT_RE
            .captures(html)
            .and_then(|caps| caps[1].parse().ok()),
        publish_date: PUBLISH_DATE_RE
            .captures(html)
            .map(|caps| caps[1].chars().take(10).collect()),
        ..Default::default()
    }
}

/// Look up both sources for `video_id`. A failing lookup is logged and adds
/// nothing; the other one still runs.
pub fn enrich(source: &dyn VideoSource, video_id: Option<&str>) -> VideoMetadata {
    let Some(id) = video_id else {
        return VideoMetadata::default();
    };

    let from_oembed = match source.oembed(id) {
        Ok(o) => metadata_from_oembed(o),
        Err(e) => {
            warn!("oEmbed failed for {}: {}", id, e);
            VideoMetadata::default()
        }
    };

    let from_page = match source.watch_page(id) {
        Ok(html) => metadata_from_watch_page(&html),
        Err(e) => {
            warn!("Page scrape failed for {}: {}", id, e);
            VideoMetadata::default()
        }
    };

    let meta = from_oembed.or(from_page);
    debug!(video_id = id, ?meta, "enriched");
    meta
}
