// src/enrich.rs
//! Per-item enrichment: text cleaning, summary construction, image download,
//! favicon resolution.
//!
//! Enrichment never fails for a single item. Every failure path degrades to a
//! documented fallback value so one bad item cannot abort the run: a dead
//! image URL keeps its remote reference, a missing favicon resolves through
//! the domain service, an unusable summary becomes a placeholder.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::source::RawItem;
use crate::workdir::RunWorkdir;

/// Summaries are bounded to this many sentences.
const MAX_SUMMARY_SENTENCES: usize = 5;
/// Image downloads are bounded to this many seconds.
const IMAGE_TIMEOUT_SECS: u64 = 10;
/// Favicon shown when neither the provider nor the item link yields one.
pub const FALLBACK_FAVICON: &str = "https://www.google.com/s2/favicons?domain=google.com&sz=32";
/// Substituted when the source text is interstitial boilerplate.
const GENERIC_PLACEHOLDER: &str = "Click the source link below to read the full story.";

/// A RawItem after cleaning and resolution; the pipeline's working unit.
///
/// `summary` is never empty and is HTML-ready: it is entity-escaped text plus
/// at most the three inline tags produced by [`expand_inline_markup`].
/// `excerpt` stays plain text; the renderer escapes it. `local_image`, when
/// set, points to a file that exists until the run's cleanup executes.
#[derive(Debug, Clone)]
pub struct EnrichedItem {
    pub title: String,
    pub link: String,
    pub published: String,
    pub excerpt: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub local_image: Option<PathBuf>,
    pub favicon: String,
}

/// Strip markup and normalize whitespace.
pub fn clean_text(s: &str) -> String {
    // Entity decode first so "&lt;p&gt;" does not survive as a tag-alike.
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Interstitial-page boilerplate ("checking your browser" walls, loaders).
fn is_interstitial(s: &str) -> bool {
    let lower = s.to_lowercase();
    ["please wait", "being verified", "loading"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Keep the first `max` sentences, splitting on sentence-ending punctuation
/// followed by whitespace. The result always carries terminal punctuation.
pub fn bound_sentences(s: &str, max: usize) -> String {
    static RE_END: OnceCell<Regex> = OnceCell::new();
    let re = RE_END.get_or_init(|| Regex::new(r"[.!?]\s+").unwrap());

    // The punctuation char is ASCII, so +1 byte keeps it in the cut.
    let cut = re.find_iter(s).nth(max.saturating_sub(1)).map(|m| m.start() + 1);
    let mut out = match cut {
        Some(i) => s[..i].to_string(),
        None => s.trim_end().to_string(),
    };
    if !out.is_empty() && !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

/// Convert the small inline emphasis set into HTML: `*bold*`, `_em_`,
/// `` `code` ``. Applied only to summaries, never to excerpts.
pub fn expand_inline_markup(s: &str) -> String {
    static RE_BOLD: OnceCell<Regex> = OnceCell::new();
    static RE_EM: OnceCell<Regex> = OnceCell::new();
    static RE_CODE: OnceCell<Regex> = OnceCell::new();

    let bold = RE_BOLD.get_or_init(|| Regex::new(r"\*([^*]+)\*").unwrap());
    let em = RE_EM.get_or_init(|| Regex::new(r"_([^_]+)_").unwrap());
    let code = RE_CODE.get_or_init(|| Regex::new(r"`([^`]+)`").unwrap());

    let out = code.replace_all(s, "<code>$1</code>");
    let out = bold.replace_all(&out, "<strong>$1</strong>");
    em.replace_all(&out, "<em>$1</em>").into_owned()
}

/// Summary policy: cleaned provider summary first, else the cleaned excerpt,
/// both bounded to five sentences; boilerplate is discarded outright; with
/// no usable text at all, a placeholder naming the title.
pub fn build_summary(title: &str, cleaned_summary: &str, cleaned_excerpt: &str) -> String {
    let text = select_summary_text(cleaned_summary, cleaned_excerpt, title);
    expand_inline_markup(&html_escape::encode_text(&text))
}

fn select_summary_text(cleaned_summary: &str, cleaned_excerpt: &str, title: &str) -> String {
    for candidate in [cleaned_summary, cleaned_excerpt] {
        if candidate.is_empty() {
            continue;
        }
        if is_interstitial(candidate) {
            return GENERIC_PLACEHOLDER.to_string();
        }
        return bound_sentences(candidate, MAX_SUMMARY_SENTENCES);
    }
    if title.is_empty() {
        GENERIC_PLACEHOLDER.to_string()
    } else {
        format!("Click the source link to read \"{title}\".")
    }
}

/// Favicon policy: a supplied absolute URL wins; else the favicon service
/// parameterized by the item link's domain; else a fixed placeholder.
pub fn resolve_favicon(favicon_url: Option<&str>, link: &str) -> String {
    if let Some(f) = favicon_url {
        if let Ok(u) = Url::parse(f) {
            if matches!(u.scheme(), "http" | "https") {
                return f.to_string();
            }
        }
    }
    if let Ok(u) = Url::parse(link) {
        if let Some(host) = u.host_str() {
            return format!("https://www.google.com/s2/favicons?domain={host}&sz=32");
        }
    }
    FALLBACK_FAVICON.to_string()
}

pub struct Enricher {
    client: reqwest::Client,
    workdir: RunWorkdir,
}

impl Enricher {
    pub fn new(workdir: RunWorkdir) -> Self {
        Self {
            client: reqwest::Client::new(),
            workdir,
        }
    }

    /// Enrich one raw item. Infallible: all failure paths degrade.
    pub async fn enrich(&self, raw: RawItem) -> EnrichedItem {
        let cleaned_text = raw.raw_text.as_deref().map(clean_text).unwrap_or_default();
        let cleaned_summary = raw
            .raw_summary
            .as_deref()
            .map(clean_text)
            .unwrap_or_default();

        // Excerpt prefers the body text, falling back to the provider summary.
        let excerpt = if cleaned_text.is_empty() {
            cleaned_summary.clone()
        } else {
            cleaned_text
        };

        let summary = build_summary(&raw.title, &cleaned_summary, &excerpt);

        let local_image = match raw.image_url.as_deref() {
            Some(url) => self.download_image(url).await,
            None => None,
        };

        let favicon = resolve_favicon(raw.favicon_url.as_deref(), &raw.link);

        EnrichedItem {
            title: raw.title,
            link: raw.link,
            published: raw.published,
            excerpt,
            summary,
            image_url: raw.image_url,
            local_image,
            favicon,
        }
    }

    /// Timed GET; a 200 body is persisted under the run workdir. Any failure
    /// yields `None` and the renderer falls back to the remote URL.
    async fn download_image(&self, url: &str) -> Option<PathBuf> {
        let response = match self
            .client
            .get(url)
            .timeout(Duration::from_secs(IMAGE_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = ?e, url = %url, "image download failed");
                return None;
            }
        };
        if response.status() != reqwest::StatusCode::OK {
            warn!(status = %response.status(), url = %url, "image download rejected");
            return None;
        }
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = ?e, url = %url, "image body read failed");
                return None;
            }
        };

        let ext = infer::get(&bytes)
            .map(|kind| kind.extension())
            .unwrap_or("jpg");
        let path = self.workdir.image_path(ext);
        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => {
                metrics::counter!("newsletter_images_downloaded_total").increment(1);
                Some(path)
            }
            Err(e) => {
                warn!(error = ?e, path = %path.display(), "persisting image failed");
                None
            }
        }
    }
}
