use curated_newsletter::enrich::Enricher;
use curated_newsletter::source::RawItem;
use curated_newsletter::workdir::RunWorkdir;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

fn raw_item(image_url: Option<String>) -> RawItem {
    RawItem {
        title: "A Story".into(),
        link: "https://example.com/a".into(),
        published: String::new(),
        raw_text: Some("<p>Some body text.</p>".into()),
        raw_summary: Some("<p>Some summary.</p>".into()),
        image_url,
        favicon_url: None,
    }
}

#[tokio::test]
async fn downloaded_image_lives_until_cleanup() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/img.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_MAGIC)
        .create_async()
        .await;

    let workdir = RunWorkdir::create().unwrap();
    let enricher = Enricher::new(workdir.clone());
    let item = enricher
        .enrich(raw_item(Some(format!("{}/img.png", server.url()))))
        .await;

    let path = item.local_image.clone().expect("image should be persisted");
    assert!(path.exists(), "local image must exist before cleanup");
    assert!(path.starts_with(workdir.path()), "image must live in the run workdir");
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));

    workdir.cleanup();
    assert!(!path.exists(), "local image must be gone after cleanup");
}

#[tokio::test]
async fn failed_download_keeps_remote_reference() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/missing.jpg")
        .with_status(404)
        .create_async()
        .await;

    let workdir = RunWorkdir::create().unwrap();
    let enricher = Enricher::new(workdir.clone());
    let url = format!("{}/missing.jpg", server.url());
    let item = enricher.enrich(raw_item(Some(url.clone()))).await;

    assert_eq!(item.local_image, None);
    assert_eq!(item.image_url.as_deref(), Some(url.as_str()));
    workdir.cleanup();
}

#[tokio::test]
async fn unreachable_image_host_degrades_quietly() {
    // Nothing listens on this port; the enricher must still return an item.
    let workdir = RunWorkdir::create().unwrap();
    let enricher = Enricher::new(workdir.clone());
    let item = enricher
        .enrich(raw_item(Some("http://127.0.0.1:1/img.jpg".into())))
        .await;

    assert_eq!(item.local_image, None);
    assert!(!item.summary.is_empty());
    workdir.cleanup();
}

#[tokio::test]
async fn markup_never_survives_into_excerpt_or_summary() {
    let workdir = RunWorkdir::create().unwrap();
    let enricher = Enricher::new(workdir.clone());
    let item = enricher
        .enrich(RawItem {
            title: "Tagged".into(),
            link: "https://example.com/t".into(),
            published: String::new(),
            raw_text: Some("<div><p>First.</p><img src='x.png'><p>Second.</p></div>".into()),
            raw_summary: Some("<b>Bold</b> claim. <a href='y'>Link</a> text.".into()),
            image_url: None,
            favicon_url: None,
        })
        .await;

    for tag in ["<div", "<p", "<img", "<b>", "<a"] {
        assert!(!item.excerpt.contains(tag), "excerpt leaked {tag}");
        assert!(!item.summary.contains(tag), "summary leaked {tag}");
    }
    workdir.cleanup();
}

#[tokio::test]
async fn summary_never_empty_even_without_text() {
    let workdir = RunWorkdir::create().unwrap();
    let enricher = Enricher::new(workdir.clone());
    let item = enricher
        .enrich(RawItem {
            title: "Bare Item".into(),
            link: "https://example.com/bare".into(),
            published: String::new(),
            raw_text: None,
            raw_summary: None,
            image_url: None,
            favicon_url: None,
        })
        .await;

    assert!(!item.summary.is_empty());
    assert!(item.summary.contains("Bare Item"));
    workdir.cleanup();
}

#[tokio::test]
async fn verification_boilerplate_is_not_surfaced() {
    let workdir = RunWorkdir::create().unwrap();
    let enricher = Enricher::new(workdir.clone());
    let item = enricher
        .enrich(RawItem {
            title: "Walled".into(),
            link: "https://example.com/w".into(),
            published: String::new(),
            raw_text: None,
            raw_summary: Some("<p>please wait, verifying your browser</p>".into()),
            image_url: None,
            favicon_url: None,
        })
        .await;

    assert!(!item.summary.to_lowercase().contains("please wait"));
    assert!(item.summary.to_lowercase().contains("source link"));
    workdir.cleanup();
}
