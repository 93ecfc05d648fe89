// src/render.rs
//! Newsletter HTML renderer.
//!
//! Pure and deterministic: the output is a function of (topic, date, items)
//! only. Two renders of the same input are byte-identical, which the delivery
//! assembler relies on when matching `cid:` references to attachments.

use chrono::NaiveDate;
use std::fmt::Write;

use crate::enrich::EnrichedItem;

/// Excerpts longer than this are cut and marked with an ellipsis.
const MAX_EXCERPT_CHARS: usize = 300;

fn truncate_excerpt(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}…")
    }
}

/// Image reference for one item: local images render as `cid:` references
/// matching the attachment content-id (the file's base name), remote-only
/// images keep their URL, imageless items render no `<img>` at all.
fn image_tag(item: &EnrichedItem) -> String {
    let src = match (&item.local_image, &item.image_url) {
        (Some(path), _) => match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => format!("cid:{name}"),
            None => return String::new(),
        },
        (None, Some(url)) => url.clone(),
        (None, None) => return String::new(),
    };
    format!(
        r#"<img src="{}" alt="{}">"#,
        html_escape::encode_double_quoted_attribute(&src),
        html_escape::encode_double_quoted_attribute(&item.title),
    )
}

/// Render the full newsletter document.
#[must_use]
pub fn render(topic: &str, date: NaiveDate, items: &[EnrichedItem]) -> String {
    let date_str = date.format("%B %d, %Y").to_string();
    let title = format!("{topic} Newsletter");

    let mut blocks = String::new();
    for item in items {
        let excerpt = truncate_excerpt(&item.excerpt, MAX_EXCERPT_CHARS);
        let _ = write!(
            blocks,
            r#"
    <div class="news-item">
        <h2><img class="favicon" src="{favicon}" alt=""> {title}</h2>
        <p class="summary">{summary}</p>
        <p class="excerpt">{excerpt}</p>
        <div class="source">Source: <a href="{link}">{link_text}</a> - {published}</div>
        {image}
    </div>
"#,
            favicon = html_escape::encode_double_quoted_attribute(&item.favicon),
            title = html_escape::encode_text(&item.title),
            // Summaries arrive HTML-ready from enrichment (escaped text plus
            // the three re-expanded inline tags); do not escape them again.
            summary = item.summary,
            excerpt = html_escape::encode_text(&excerpt),
            link = html_escape::encode_double_quoted_attribute(&item.link),
            link_text = html_escape::encode_text(&item.link),
            published = html_escape::encode_text(&item.published),
            image = image_tag(item),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; max-width: 800px; margin: 0 auto; padding: 20px; }}
        h1 {{ color: #333; text-align: center; border-bottom: 2px solid #f0f0f0; padding-bottom: 10px; }}
        .date {{ color: #666; font-size: 0.9em; text-align: center; margin-bottom: 20px; }}
        .news-item {{ margin-bottom: 30px; padding: 20px; background: #f9f9f9; border-radius: 8px; }}
        .news-item h2 {{ color: #2a5db0; margin-top: 0; }}
        .news-item .favicon {{ width: 16px; height: 16px; vertical-align: middle; }}
        .news-item .summary {{ color: #333; margin: 10px 0; }}
        .news-item .excerpt {{ color: #666; margin: 10px 0; }}
        .news-item .source {{ color: #999; font-size: 0.9em; margin-top: 5px; }}
        .news-item img {{ max-width: 100%; height: auto; border-radius: 4px; margin: 10px 0; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <div class="date">{date}</div>
{blocks}
</body>
</html>
"#,
        title = html_escape::encode_text(&title),
        date = html_escape::encode_text(&date_str),
        blocks = blocks,
    )
}
