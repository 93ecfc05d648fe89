// src/source/search.rs
//! Search source adapter: one search-with-contents call to the Exa provider.
//!
//! Unlike the feed adapter, a provider-side error here aborts the run. The
//! asymmetry is deliberate: a feed map degrades gracefully source by source,
//! a single failed search leaves nothing worth sending.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::SearchConfig;
use crate::source::{ensure_metrics_described, RawItem, SourceAdapter};

pub const DEFAULT_NUM_RESULTS: usize = 5;

/// Bounded excerpt length requested from the provider, in characters.
const TEXT_MAX_CHARACTERS: usize = 450;
/// Extracted links/images requested per result.
const EXTRAS_PER_RESULT: usize = 5;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    contents: ContentsSpec<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentsSpec<'a> {
    text: TextSpec,
    livecrawl: &'static str,
    summary: SummarySpec<'a>,
    extras: ExtrasSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextSpec {
    max_characters: usize,
}

#[derive(Serialize)]
struct SummarySpec<'a> {
    query: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtrasSpec {
    links: usize,
    image_links: usize,
}

/// Provider result record; every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderResult {
    url: Option<String>,
    title: Option<String>,
    published_date: Option<String>,
    text: Option<String>,
    summary: Option<String>,
    image: Option<String>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    image_urls: Vec<String>,
    favicon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ProviderResult>,
}

pub struct SearchAdapter {
    cfg: SearchConfig,
    client: reqwest::Client,
    query: String,
    num_results: usize,
}

impl SearchAdapter {
    pub fn new(cfg: SearchConfig, query: impl Into<String>, num_results: usize) -> Self {
        Self {
            cfg,
            client: reqwest::Client::new(),
            query: query.into(),
            num_results,
        }
    }

    fn convert(result: ProviderResult) -> RawItem {
        let link = result.url.unwrap_or_default();
        // Title falls back to the URL so the rendered block is never blank.
        let title = result
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| link.clone());

        let image_url = result
            .image
            .or_else(|| result.images.into_iter().next())
            .or_else(|| result.image_urls.into_iter().next());

        // Only a well-formed absolute favicon URL is kept; anything else is
        // resolved later by the enricher's domain fallback.
        let favicon_url = result.favicon.filter(|f| {
            Url::parse(f)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false)
        });

        RawItem {
            title,
            link,
            published: result.published_date.unwrap_or_default(),
            raw_text: result.text,
            raw_summary: result.summary,
            image_url,
            favicon_url,
        }
    }
}

#[async_trait]
impl SourceAdapter for SearchAdapter {
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        ensure_metrics_described();

        let request = SearchRequest {
            query: &self.query,
            num_results: self.num_results,
            contents: ContentsSpec {
                text: TextSpec {
                    max_characters: TEXT_MAX_CHARACTERS,
                },
                livecrawl: "always",
                summary: SummarySpec { query: &self.query },
                extras: ExtrasSpec {
                    links: EXTRAS_PER_RESULT,
                    image_links: EXTRAS_PER_RESULT,
                },
            },
        };

        let response = self
            .client
            .post(&self.cfg.endpoint)
            .header("x-api-key", &self.cfg.api_key)
            .json(&request)
            .send()
            .await
            .context("search provider request failed")?
            .error_for_status()
            .context("search provider returned an error status")?
            .json::<SearchResponse>()
            .await
            .context("decoding search provider response")?;

        let items: Vec<RawItem> = response.results.into_iter().map(Self::convert).collect();
        counter!("newsletter_items_total").increment(items.len() as u64);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "search"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_to_url() {
        let raw = SearchAdapter::convert(ProviderResult {
            url: Some("https://example.com/story".into()),
            ..Default::default()
        });
        assert_eq!(raw.title, "https://example.com/story");
    }

    #[test]
    fn image_field_wins_over_lists() {
        let raw = SearchAdapter::convert(ProviderResult {
            image: Some("https://img.example.com/main.jpg".into()),
            images: vec!["https://img.example.com/other.jpg".into()],
            ..Default::default()
        });
        assert_eq!(
            raw.image_url.as_deref(),
            Some("https://img.example.com/main.jpg")
        );

        let raw = SearchAdapter::convert(ProviderResult {
            image_urls: vec!["https://img.example.com/from-list.jpg".into()],
            ..Default::default()
        });
        assert_eq!(
            raw.image_url.as_deref(),
            Some("https://img.example.com/from-list.jpg")
        );
    }

    #[test]
    fn malformed_favicon_is_dropped() {
        let raw = SearchAdapter::convert(ProviderResult {
            favicon: Some("/favicon.ico".into()),
            ..Default::default()
        });
        assert_eq!(raw.favicon_url, None);

        let raw = SearchAdapter::convert(ProviderResult {
            favicon: Some("https://example.com/favicon.ico".into()),
            ..Default::default()
        });
        assert_eq!(
            raw.favicon_url.as_deref(),
            Some("https://example.com/favicon.ico")
        );
    }
}
