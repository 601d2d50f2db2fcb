//! Integration tests for the HTTP listing source and collector against a mock forum.

use std::time::Duration;

use favorite_archiver::collector::{Collector, FetchError, HttpListingSource, ListingSource};
use favorite_archiver::config::Config;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Create a test configuration pointing at the mock server.
fn create_test_config(origin: &str) -> Config {
    Config {
        site_origin: origin.to_string(),
        ..Config::for_testing()
    }
}

fn listing_page(titles: &[&str]) -> String {
    let blocks: String = titles
        .iter()
        .map(|title| {
            format!(
                r#"<div class="topic-item"><h1 id="title" data-title="{title}">{title}</h1>
<ul><li data-favorite-count="7"><div class="content">about {title}<br>
<a href="https://media.example.com/i/{title}">(image)</a></div>
<a class="entry-date permalink" href="/entry/{title}">05.03.2024 09:00</a>
<a class="entry-author" href="/biri/writer">writer</a></li></ul></div>"#
            )
        })
        .collect();
    format!("<html><body>{blocks}</body></html>")
}

#[tokio::test]
async fn test_fetch_page_sends_query_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/favori-entryleri"))
        .and(query_param("p", "2"))
        .and(query_param("nick", "alice"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .and(header("Cookie", "a=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&["one"])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config
        .request_headers
        .insert("Cookie".to_string(), "a=1".to_string());
    let source = HttpListingSource::new(&config).unwrap();

    let body = source.fetch_page("alice", 2).await.unwrap();
    assert!(body.contains("topic-item"));
}

#[tokio::test]
async fn test_page_url_carries_cache_buster() {
    let config = create_test_config("https://forum.example.com");
    let source = HttpListingSource::new(&config).unwrap();

    let url = source.page_url("bob smith", 3);
    assert_eq!(url.path(), "/favori-entryleri");

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs[0].0, "_");
    assert!(pairs[0].1.parse::<i64>().is_ok());
    assert_eq!(pairs[1], ("p".to_string(), "3".to_string()));
    assert_eq!(pairs[2], ("nick".to_string(), "bob smith".to_string()));
}

#[tokio::test]
async fn test_fetch_page_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/favori-entryleri"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = HttpListingSource::new(&create_test_config(&server.uri())).unwrap();
    let err = source.fetch_page("alice", 1).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { page: 1, status: 503 }));
}

#[tokio::test]
async fn test_fetch_page_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/favori-entryleri"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&["slow"]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = Config {
        fetch_timeout: Duration::from_millis(300),
        ..create_test_config(&server.uri())
    };
    let source = HttpListingSource::new(&config).unwrap();

    let err = source.fetch_page("alice", 1).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { page: 1 }), "got {err:?}");
}

#[tokio::test]
async fn test_collector_pages_through_listing_until_empty_page() {
    let server = MockServer::start().await;

    for (page, body) in [
        ("1", listing_page(&["a", "b"])),
        ("2", listing_page(&["c"])),
        ("3", String::new()),
    ] {
        Mock::given(method("GET"))
            .and(path("/favori-entryleri"))
            .and(query_param("p", page))
            .and(query_param("nick", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = create_test_config(&server.uri());
    let mut collector = Collector::from_config(&config).unwrap();
    collector.set_subject("alice").unwrap();

    assert_eq!(collector.fetch_next_page().await.unwrap(), 2);

    let mut titles = Vec::new();
    while let Ok(entry) = collector.pop_front().await {
        titles.push(entry.title);
    }
    assert_eq!(titles, vec!["a", "b", "c"]);
    assert!(collector.is_exhausted());
    assert_eq!(collector.next_page(), 4);

    // Past the end nothing is requested again; the mocks' `expect(1)` checks this.
    assert_eq!(collector.fetch_next_page().await.unwrap(), 0);
}

#[tokio::test]
async fn test_collector_parses_entry_fields_from_mock_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/favori-entryleri"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&["rust"])))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let mut collector = Collector::from_config(&config).unwrap();
    collector.set_subject("alice").unwrap();
    collector.fetch_next_page().await.unwrap();

    let entry = collector.peek_front().unwrap();
    assert_eq!(entry.title, "rust");
    assert_eq!(entry.author, "writer");
    assert_eq!(entry.date, "05.03.2024 09:00");
    assert_eq!(entry.favorite_count, "7");
    assert_eq!(entry.url, format!("{}/entry/rust", server.uri()));
    assert_eq!(entry.image_urls, vec!["https://media.example.com/i/rust"]);
}
