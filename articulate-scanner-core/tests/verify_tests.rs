// Tests for link verification against local HTTP servers

use articulate_scanner_core::verify::{
    LinkStatus, VerificationResult, Verifier, VerifyOptions, VerifyProgressCallback,
};
use articulate_scanner_crawler::LinkRecord;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn verifier(timeout: Duration) -> Verifier {
    Verifier::new(VerifyOptions {
        max_workers: 10,
        timeout,
        ..VerifyOptions::default()
    })
    .unwrap()
}

fn record(url: &str, lesson: &str) -> LinkRecord {
    LinkRecord {
        url: url.to_string(),
        source: "https://rise.articulate.com/share/abc".to_string(),
        course: "https://rise.articulate.com/share/abc".to_string(),
        lesson: lesson.to_string(),
        link_text: None,
        depth: 0,
    }
}

#[tokio::test]
async fn test_one_timeout_among_ten() {
    let mock_server = MockServer::start().await;

    for i in 0..9 {
        Mock::given(method("HEAD"))
            .and(path(format!("/ok{}", i)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("HEAD"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let mut urls: Vec<String> = (0..9)
        .map(|i| format!("{}/ok{}", mock_server.uri(), i))
        .collect();
    urls.insert(4, format!("{}/slow", mock_server.uri()));

    let results = verifier(Duration::from_secs(1)).verify_urls(urls.clone()).await;

    assert_eq!(results.len(), 10);
    let broken: Vec<&VerificationResult> = results
        .iter()
        .filter(|r| r.status == LinkStatus::Broken)
        .collect();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].url, urls[4]);
    assert_eq!(broken[0].status_code, None);
    assert_eq!(
        results
            .iter()
            .filter(|r| r.status == LinkStatus::Working)
            .count(),
        9
    );

    // Input order is preserved
    for (result, url) in results.iter().zip(urls.iter()) {
        assert_eq!(&result.url, url);
    }
}

#[tokio::test]
async fn test_head_not_allowed_falls_back_to_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/page", mock_server.uri());
    let results = verifier(Duration::from_secs(5)).verify_urls(vec![url]).await;

    assert_eq!(results[0].status, LinkStatus::Working);
    assert_eq!(results[0].status_code, Some(200));
}

#[tokio::test]
async fn test_followed_redirect_is_reported() {
    let mock_server = MockServer::start().await;
    let target = format!("{}/final", mock_server.uri());

    Mock::given(method("HEAD"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", target.as_str()))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let url = format!("{}/old", mock_server.uri());
    let results = verifier(Duration::from_secs(5)).verify_urls(vec![url]).await;

    assert_eq!(results[0].status, LinkStatus::Redirected);
    assert_eq!(results[0].status_code, Some(200));
    assert_eq!(results[0].final_url.as_deref(), Some(target.as_str()));
    assert_eq!(results[0].message(), format!("Redirects to {}", target));
}

#[tokio::test]
async fn test_not_found_is_broken() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing", mock_server.uri());
    let results = verifier(Duration::from_secs(5)).verify_urls(vec![url]).await;

    assert_eq!(results[0].status, LinkStatus::Broken);
    assert_eq!(results[0].status_code, Some(404));
    assert!(results[0].message().contains("404"));
}

#[tokio::test]
async fn test_server_error_is_broken() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/boom"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let url = format!("{}/boom", mock_server.uri());
    let results = verifier(Duration::from_secs(5)).verify_urls(vec![url]).await;

    assert_eq!(results[0].status, LinkStatus::Broken);
    assert_eq!(results[0].status_code, Some(503));
}

#[tokio::test]
async fn test_redirect_loop_is_broken() {
    let mock_server = MockServer::start().await;
    let target = format!("{}/loop", mock_server.uri());

    Mock::given(method("HEAD"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", target.as_str()))
        .mount(&mock_server)
        .await;

    let results = verifier(Duration::from_secs(5)).verify_urls(vec![target]).await;

    assert_eq!(results[0].status, LinkStatus::Broken);
    assert_eq!(results[0].status_code, None);
    assert_eq!(
        results[0].error.as_deref(),
        Some("Too many redirects or redirect loop")
    );
}

#[tokio::test]
async fn test_connection_refused_is_broken() {
    let results = verifier(Duration::from_secs(5))
        .verify_urls(vec!["http://127.0.0.1:1/".to_string()])
        .await;

    assert_eq!(results[0].status, LinkStatus::Broken);
    assert_eq!(results[0].status_code, None);
    assert!(results[0].error.is_some());
}

#[tokio::test]
async fn test_duplicate_records_verified_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/shared"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/other"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let shared = format!("{}/shared", mock_server.uri());
    let other = format!("{}/other", mock_server.uri());
    let records = vec![
        record(&shared, "Intro"),
        record(&other, "Intro"),
        record(&shared, "Summary"),
    ];

    let results = verifier(Duration::from_secs(5)).verify(&records).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, shared);
    assert_eq!(results[1].url, other);
}

#[tokio::test]
async fn test_progress_callback_counts_every_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let last_done = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let last_clone = last_done.clone();
    let callback: VerifyProgressCallback =
        Arc::new(move |done: usize, total: usize, _result: &VerificationResult| {
            assert_eq!(total, 5);
            calls_clone.fetch_add(1, Ordering::SeqCst);
            last_clone.fetch_max(done, Ordering::SeqCst);
        });

    let urls: Vec<String> = (0..5)
        .map(|i| format!("{}/p{}", mock_server.uri(), i))
        .collect();
    let results = Verifier::new(VerifyOptions {
        max_workers: 2,
        ..VerifyOptions::default()
    })
    .unwrap()
    .with_progress_callback(callback)
    .verify_urls(urls)
    .await;

    assert_eq!(results.len(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(last_done.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_empty_input() {
    let results = verifier(Duration::from_secs(1)).verify_urls(Vec::new()).await;
    assert!(results.is_empty());
}
