//! Feed view driven end to end against a mocked feed server.

use pixfeed::api::ApiClient;
use pixfeed::feed::{FeedEvent, FeedSettings, FeedView, PageState, FETCH_FAILED_NOTICE};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn post_json(i: usize) -> Value {
    json!({
        "id": format!("p{i}"),
        "image_url": format!("https://cdn.example.com/{i}.jpg"),
        "title": format!("Post {i}"),
        "tags": ["sunset"],
        "created_at": "2024-05-01T10:00:00Z",
    })
}

fn page(range: std::ops::Range<usize>, next: Option<&str>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "items": range.map(post_json).collect::<Vec<_>>(),
        "next_cursor": next,
        "has_more": next.is_some(),
    }))
}

fn settings() -> FeedSettings {
    FeedSettings {
        debounce: Duration::from_millis(20),
        ..FeedSettings::default()
    }
}

fn mount(server: &MockServer, term: &str) -> (FeedView, mpsc::Receiver<FeedEvent>) {
    let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let (tx, rx) = mpsc::channel(32);
    let view = FeedView::mount(Arc::new(api), None, &settings(), term, tx);
    (view, rx)
}

async fn pump(view: &mut FeedView, rx: &mut mpsc::Receiver<FeedEvent>) {
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for feed event")
        .expect("feed channel closed");
    view.handle(event);
}

fn ids(view: &FeedView) -> Vec<String> {
    view.posts().iter().map(|p| p.id.as_str().to_string()).collect()
}

#[tokio::test]
async fn test_scrolling_walks_every_page_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .and(query_param("limit", "10"))
        .and(query_param_is_missing("cursor"))
        .respond_with(page(0..10, Some("c1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .and(query_param("cursor", "c1"))
        .respond_with(page(10..20, Some("c2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .and(query_param("cursor", "c2"))
        .respond_with(page(20..25, None))
        .expect(1)
        .mount(&server)
        .await;

    let (mut view, mut rx) = mount(&server, "");
    pump(&mut view, &mut rx).await;
    assert_eq!(view.len(), 10);

    while !view.is_exhausted() {
        let last = view.len() - 1;
        assert!(view.item_visible(last));
        // Re-reporting the same row while loading does nothing
        assert!(!view.item_visible(last));
        pump(&mut view, &mut rx).await;
    }

    assert_eq!(view.len(), 25);
    assert_eq!(ids(&view), (0..25).map(|i| format!("p{i}")).collect::<Vec<_>>());
    assert_eq!(view.page_state(), PageState::Exhausted);
    assert!(!view.item_visible(24));

    view.unmount();
    // Dropping the server verifies each page was requested exactly once
}

#[tokio::test]
async fn test_settled_search_replaces_list_with_tagged_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .and(query_param_is_missing("tag"))
        .respond_with(page(0..10, Some("c1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .and(query_param("tag", "sunset"))
        .respond_with(page(100..102, None))
        .expect(1)
        .mount(&server)
        .await;

    let (mut view, mut rx) = mount(&server, "");
    pump(&mut view, &mut rx).await;

    for typed in ["s", "sun", "sunset "] {
        view.search_input(typed);
    }
    // Settled term, then the page it requested
    pump(&mut view, &mut rx).await;
    assert_eq!(view.term(), Some("sunset"));
    pump(&mut view, &mut rx).await;

    assert_eq!(ids(&view), vec!["p100", "p101"]);
    assert!(view.is_exhausted());
}

#[tokio::test]
async fn test_failed_first_page_raises_notice_and_refresh_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .respond_with(page(0..3, None))
        .mount(&server)
        .await;

    let (mut view, mut rx) = mount(&server, "");
    pump(&mut view, &mut rx).await;
    assert!(view.is_empty());
    assert_eq!(view.notice(), Some(FETCH_FAILED_NOTICE));
    assert_eq!(view.page_state(), PageState::Idle);

    view.refresh();
    pump(&mut view, &mut rx).await;
    assert_eq!(view.len(), 3);
}

#[tokio::test]
async fn test_initial_term_is_sent_on_first_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .and(query_param("tag", "beach"))
        .respond_with(page(0..1, None))
        .expect(1)
        .mount(&server)
        .await;

    let (mut view, mut rx) = mount(&server, "  beach ");
    assert_eq!(view.term(), Some("beach"));
    pump(&mut view, &mut rx).await;
    assert_eq!(ids(&view), vec!["p0"]);
}
