// src/source/mod.rs
pub mod feeds;
pub mod search;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;

/// One-time metrics registration for the aggregation stage.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "newsletter_items_total",
            "Raw items emitted by source adapters."
        );
        describe_counter!(
            "newsletter_source_errors_total",
            "Feed fetch/parse errors (skipped sources)."
        );
        describe_histogram!(
            "newsletter_feed_parse_ms",
            "Feed parse time in milliseconds."
        );
    });
}

/// Unnormalized content record as obtained from a source.
///
/// Both adapter variants convert their provider-specific records into this
/// one shape at the adapter boundary; enrichment never sees provider fields.
/// Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawItem {
    pub title: String,
    /// Source link of the item.
    pub link: String,
    /// Published date, verbatim from the provider ("" when absent).
    pub published: String,
    /// Body text; may contain markup.
    pub raw_text: Option<String>,
    /// Provider-supplied summary; may contain markup.
    pub raw_summary: Option<String>,
    /// Candidate display image.
    pub image_url: Option<String>,
    /// Candidate favicon; only set when already a well-formed absolute URL.
    pub favicon_url: Option<String>,
}

/// A producer of raw content records for one newsletter run.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch_items(&self) -> Result<Vec<RawItem>>;
    fn name(&self) -> &'static str;
}

/// Built-in feed set, used when the caller supplies no mapping.
pub fn default_feeds() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "techcrunch".to_string(),
            "https://techcrunch.com/feed/".to_string(),
        ),
        (
            "mashable".to_string(),
            "https://mashable.com/feed/".to_string(),
        ),
        ("cnet".to_string(), "https://www.cnet.com/rss/all/".to_string()),
    ])
}

const ENV_FEEDS_PATH: &str = "NEWSLETTER_FEEDS_PATH";

/// Load a feed map from an explicit TOML path (`[feeds]` table of name → URL).
pub fn load_feeds_from(path: &Path) -> Result<BTreeMap<String, String>> {
    #[derive(serde::Deserialize)]
    struct FeedsFile {
        feeds: BTreeMap<String, String>,
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading feeds from {}", path.display()))?;
    let parsed: FeedsFile = toml::from_str(&content)
        .with_context(|| format!("parsing feeds from {}", path.display()))?;
    Ok(parsed
        .feeds
        .into_iter()
        .filter(|(name, url)| !name.trim().is_empty() && !url.trim().is_empty())
        .collect())
}

/// Load the feed map using `$NEWSLETTER_FEEDS_PATH`, then `config/feeds.toml`.
/// No file present means an empty map; the feed adapter then falls back to
/// the built-in set.
pub fn load_feeds_default() -> Result<BTreeMap<String, String>> {
    if let Ok(p) = std::env::var(ENV_FEEDS_PATH) {
        return load_feeds_from(Path::new(&p));
    }
    let default_path = Path::new("config/feeds.toml");
    if default_path.exists() {
        return load_feeds_from(default_path);
    }
    Ok(BTreeMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_feed_set_is_nonempty() {
        let feeds = default_feeds();
        assert_eq!(feeds.len(), 3);
        assert!(feeds.values().all(|u| u.starts_with("https://")));
    }

    #[test]
    fn feeds_toml_parses_and_drops_blank_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("feeds.toml");
        std::fs::write(
            &p,
            r#"
[feeds]
techmeme = "https://www.techmeme.com/feed.xml"
blank = ""
"#,
        )
        .unwrap();
        let feeds = load_feeds_from(&p).unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(
            feeds.get("techmeme").map(String::as_str),
            Some("https://www.techmeme.com/feed.xml")
        );
    }

    #[serial_test::serial]
    #[test]
    fn malformed_feeds_file_is_an_error_not_a_silent_default() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("feeds.toml");
        std::fs::write(&p, r#"feeds = "not a table""#).unwrap();
        assert!(load_feeds_from(&p).is_err());

        // The env-driven loader surfaces the same error so callers can log it
        // before falling back.
        std::env::set_var(ENV_FEEDS_PATH, p.display().to_string());
        assert!(load_feeds_default().is_err());
        std::env::remove_var(ENV_FEEDS_PATH);
    }
}
