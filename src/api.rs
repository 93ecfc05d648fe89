// src/api.rs
//! HTTP request shell.
//!
//! One POST route accepts a structured newsletter request, runs aggregation
//! and enrichment inline so provider failures surface in the response, then
//! hands delivery and cleanup to a background task and acknowledges
//! immediately. Delivery failures after the ack are observable via logs only.

use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tower_http::cors::CorsLayer;

use crate::config::{MailConfig, SearchConfig};
use crate::pipeline;
use crate::source::search::{SearchAdapter, DEFAULT_NUM_RESULTS};
use crate::source::{feeds::FeedAdapter, load_feeds_default, SourceAdapter};
use crate::workdir::RunWorkdir;

/// Topic used for feed-driven runs, which carry no query string.
const DEFAULT_TOPIC: &str = "Daily Tech";

#[derive(Debug, Deserialize)]
pub struct NewsletterRequest {
    /// Search query; absent means a feed-driven run.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    /// Feed map for the feed variant; empty falls back to the configured
    /// feeds file, then to the built-in set.
    #[serde(default)]
    pub feeds: BTreeMap<String, String>,
}

fn default_num_results() -> usize {
    DEFAULT_NUM_RESULTS
}

pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/newsletter", post(generate_and_send))
        .layer(CorsLayer::very_permissive())
}

fn error_response(status: StatusCode, err: &anyhow::Error) -> Response {
    (status, axum::Json(json!({ "error": format!("{err:#}") }))).into_response()
}

async fn generate_and_send(Json(req): Json<NewsletterRequest>) -> Response {
    // Configuration errors are fatal before any network attempt.
    let mail_cfg = match MailConfig::from_env() {
        Ok(c) => c,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    };

    let mut recipients = req.emails;
    if recipients.is_empty() {
        match &mail_cfg.default_recipient {
            Some(r) => recipients.push(r.clone()),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    axum::Json(json!({ "error": "no recipients given and EMAIL_RECIPIENT not set" })),
                )
                    .into_response()
            }
        }
    }

    let topic = req.query.clone().unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let adapter: Box<dyn SourceAdapter> = match req.query {
        Some(query) => {
            let search_cfg = match SearchConfig::from_env() {
                Ok(c) => c,
                Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
            };
            Box::new(SearchAdapter::new(search_cfg, query, req.num_results))
        }
        None => {
            let feeds = if req.feeds.is_empty() {
                match load_feeds_default() {
                    Ok(feeds) => feeds,
                    Err(e) => {
                        tracing::warn!(error = ?e, "feeds config unreadable, using built-in defaults");
                        BTreeMap::new()
                    }
                }
            } else {
                req.feeds
            };
            Box::new(FeedAdapter::new(feeds))
        }
    };

    let workdir = match RunWorkdir::create() {
        Ok(w) => w,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    };

    // Aggregation + enrichment run inline: a fatal source error (search
    // variant) must surface in this response, not in a background log.
    let items = match pipeline::collect_items(adapter.as_ref(), &workdir).await {
        Ok(items) => items,
        Err(e) => {
            workdir.cleanup();
            return error_response(StatusCode::BAD_GATEWAY, &e);
        }
    };

    let status = format!("Newsletter is being sent to {}", recipients.join(", "));

    // Delivery and cleanup proceed after the ack; cleanup runs strictly
    // after delivery within the same task.
    tokio::spawn(async move {
        if let Err(e) =
            pipeline::deliver_and_cleanup(&topic, &mail_cfg, recipients, &items, &workdir).await
        {
            tracing::error!(error = ?e, "background delivery failed");
        }
    });

    axum::Json(json!({ "status": status })).into_response()
}
