// src/source/feeds.rs
//! Feed source adapter: pulls items from configured RSS feeds.
//!
//! A fetch or parse failure for one source contributes zero items and never
//! aborts the run; the remaining sources still produce. This is intentionally
//! more forgiving than the search adapter, which treats provider errors as
//! fatal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::source::{default_feeds, ensure_metrics_described, RawItem, SourceAdapter};

/// At most this many entries are taken per feed.
const MAX_ENTRIES_PER_FEED: usize = 5;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    // content:encoded carries the entry's embedded HTML body.
    // quick-xml's serde deserializer strips namespace prefixes, so the
    // element arrives as plain `encoded`.
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
    // media:content attachments; the first one with a url wins.
    #[serde(rename = "content", default)]
    media: Vec<MediaContent>,
}

#[derive(Debug, Deserialize)]
struct MediaContent {
    #[serde(rename = "@url")]
    url: Option<String>,
}

/// First `<img src>` inside an HTML fragment, if any.
fn first_img_src(html: &str) -> Option<String> {
    static RE_IMG: OnceCell<Regex> = OnceCell::new();
    let re = RE_IMG
        .get_or_init(|| Regex::new(r#"(?is)<img[^>]*\ssrc\s*=\s*["']([^"']+)["']"#).unwrap());
    re.captures(html).map(|c| c[1].to_string())
}

pub struct FeedAdapter {
    feeds: BTreeMap<String, String>,
    client: reqwest::Client,
}

impl FeedAdapter {
    /// An empty mapping substitutes the built-in default feed set.
    pub fn new(feeds: BTreeMap<String, String>) -> Self {
        let feeds = if feeds.is_empty() {
            default_feeds()
        } else {
            feeds
        };
        Self {
            feeds,
            client: reqwest::Client::new(),
        }
    }

    pub fn feeds(&self) -> &BTreeMap<String, String> {
        &self.feeds
    }

    fn parse_feed(xml: &str) -> Result<Vec<RawItem>> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(xml).context("parsing rss xml")?;

        let mut out = Vec::new();
        for it in rss.channel.items.into_iter().take(MAX_ENTRIES_PER_FEED) {
            let content = it.content_encoded.as_deref().unwrap_or_default();
            // media:content attachment first, else first <img> in the body.
            let image_url = it
                .media
                .iter()
                .find_map(|m| m.url.clone())
                .or_else(|| first_img_src(content));

            out.push(RawItem {
                title: it.title.unwrap_or_default(),
                link: it.link.unwrap_or_default(),
                published: it.pub_date.unwrap_or_default(),
                raw_text: it.content_encoded,
                raw_summary: it.description,
                image_url,
                favicon_url: None,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("newsletter_feed_parse_ms").record(ms);
        Ok(out)
    }

    async fn fetch_one(&self, url: &str) -> Result<Vec<RawItem>> {
        let body = self
            .client
            .get(url)
            .send()
            .await
            .context("feed http get()")?
            .error_for_status()
            .context("feed http status")?
            .text()
            .await
            .context("feed http .text()")?;
        Self::parse_feed(&body)
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        ensure_metrics_described();

        let mut out = Vec::new();
        for (name, url) in &self.feeds {
            tracing::info!(source = %name, url = %url, "scraping feed");
            match self.fetch_one(url).await {
                Ok(mut items) => out.append(&mut items),
                Err(e) => {
                    // Skip this source, keep the run alive.
                    tracing::warn!(error = ?e, source = %name, "feed error, skipping source");
                    counter!("newsletter_source_errors_total").increment(1);
                }
            }
        }
        counter!("newsletter_items_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "feeds"
    }
}
