use std::collections::BTreeMap;

use curated_newsletter::source::feeds::FeedAdapter;
use curated_newsletter::source::SourceAdapter;

fn feed_xml(source: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>{source}</title>
    <item>
      <title>{source} headline</title>
      <link>https://{source}.example.com/1</link>
      <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>
      <description>A {source} story.</description>
    </item>
  </channel>
</rss>"#
    )
}

#[tokio::test]
async fn one_unreachable_feed_does_not_abort_the_run() {
    let mut server = mockito::Server::new_async().await;
    let _a = server
        .mock("GET", "/alpha.xml")
        .with_status(200)
        .with_body(feed_xml("alpha"))
        .create_async()
        .await;
    let _b = server
        .mock("GET", "/beta.xml")
        .with_status(200)
        .with_body(feed_xml("beta"))
        .create_async()
        .await;
    // No mock for /gamma.xml: mockito answers 501 for unmatched routes.

    let feeds = BTreeMap::from([
        ("alpha".to_string(), format!("{}/alpha.xml", server.url())),
        ("beta".to_string(), format!("{}/beta.xml", server.url())),
        ("gamma".to_string(), format!("{}/gamma.xml", server.url())),
    ]);

    let adapter = FeedAdapter::new(feeds);
    let items = adapter.fetch_items().await.expect("run must not fail");

    assert_eq!(items.len(), 2, "only the reachable feeds contribute");
    let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    assert!(titles.contains(&"alpha headline"));
    assert!(titles.contains(&"beta headline"));
}

#[tokio::test]
async fn malformed_feed_is_skipped_not_fatal() {
    let mut server = mockito::Server::new_async().await;
    let _good = server
        .mock("GET", "/good.xml")
        .with_status(200)
        .with_body(feed_xml("good"))
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/broken.xml")
        .with_status(200)
        .with_body("this is not xml at all")
        .create_async()
        .await;

    let feeds = BTreeMap::from([
        ("good".to_string(), format!("{}/good.xml", server.url())),
        ("broken".to_string(), format!("{}/broken.xml", server.url())),
    ]);

    let adapter = FeedAdapter::new(feeds);
    let items = adapter.fetch_items().await.expect("run must not fail");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "good headline");
}

#[tokio::test]
async fn all_feeds_down_yields_an_empty_run_not_an_error() {
    let feeds = BTreeMap::from([(
        "dead".to_string(),
        "http://127.0.0.1:1/feed.xml".to_string(),
    )]);
    let adapter = FeedAdapter::new(feeds);
    let items = adapter.fetch_items().await.expect("run must not fail");
    assert!(items.is_empty());
}
