use axum::body::Body;
use http::Request;
use tower::ServiceExt;

#[tokio::test]
async fn health_endpoint_answers_ok() {
    let app = curated_newsletter::api::create_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build request");

    let resp = app.oneshot(req).await.expect("call /health");
    assert!(resp.status().is_success());
}

#[serial_test::serial]
#[tokio::test]
async fn newsletter_without_mail_credentials_is_a_config_error() {
    std::env::remove_var("EMAIL_USER");
    std::env::remove_var("EMAIL_APP_PASSWORD");

    let app = curated_newsletter::api::create_router();
    let req = Request::builder()
        .method("POST")
        .uri("/newsletter")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "query": "ai", "emails": ["a@example.com"] }).to_string(),
        ))
        .expect("build request");

    let resp = app.oneshot(req).await.expect("call /newsletter");
    assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
}
