// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use leadgen_audit::config::settings::ProviderSettings;
use leadgen_audit::domain::search::engine::SearchProvider;
use leadgen_audit::infrastructure::search::google_cse::GoogleCseProvider;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::{capture_logs, cse_body, fast_provider_settings, links, set_credentials};

const API_PATH: &str = "/customsearch/v1";

fn provider(server: &MockServer, settings: ProviderSettings) -> GoogleCseProvider {
    GoogleCseProvider::new(settings).with_endpoint(format!("{}{}", server.uri(), API_PATH))
}

#[tokio::test]
async fn test_single_page_results() {
    let server = MockServer::start().await;
    set_credentials("GCSE_SINGLE_KEY", "GCSE_SINGLE_CX");

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("q", "plumber atlanta"))
        .and(query_param("key", "test-key"))
        .and(query_param("cx", "test-cx"))
        .and(query_param("start", "1"))
        .and(query_param("num", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "link": "https://a.com/one" },
                { "formattedUrl": "b.com" },
                { "title": "no url" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut google = provider(
        &server,
        fast_provider_settings("GCSE_SINGLE_KEY", "GCSE_SINGLE_CX"),
    );
    let urls = google.query("plumber atlanta", 5).await;

    assert_eq!(urls, vec!["https://a.com/one", "b.com"]);
    assert_eq!(google.queries_made(), 1);
}

#[tokio::test]
async fn test_pagination_until_short_page() {
    let server = MockServer::start().await;
    set_credentials("GCSE_PAGES_KEY", "GCSE_PAGES_CX");

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("start", "1"))
        .and(query_param("num", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cse_body(&links("first", 10))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("start", "11"))
        .and(query_param("num", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cse_body(&links("second", 3))))
        .expect(1)
        .mount(&server)
        .await;

    let mut google = provider(&server, fast_provider_settings("GCSE_PAGES_KEY", "GCSE_PAGES_CX"));
    let urls = google.query("roofers", 15).await;

    assert_eq!(urls.len(), 13);
    assert_eq!(google.queries_made(), 1);
}

#[tokio::test]
async fn test_rate_limited_then_success_counts_once() {
    let server = MockServer::start().await;
    set_credentials("GCSE_RETRY_KEY", "GCSE_RETRY_CX");

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cse_body(&["https://retry-ok.com".to_string()])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut google = provider(&server, fast_provider_settings("GCSE_RETRY_KEY", "GCSE_RETRY_CX"));
    let urls = google.query("electricians", 10).await;

    assert_eq!(urls, vec!["https://retry-ok.com"]);
    assert_eq!(google.queries_made(), 1);
}

#[tokio::test]
async fn test_retry_budget_exhausted_returns_empty() {
    let server = MockServer::start().await;
    set_credentials("GCSE_EXHAUST_KEY", "GCSE_EXHAUST_CX");

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let settings = ProviderSettings {
        retry_attempts: 2,
        ..fast_provider_settings("GCSE_EXHAUST_KEY", "GCSE_EXHAUST_CX")
    };
    let mut google = provider(&server, settings);

    assert!(google.query("hvac", 10).await.is_empty());
    assert_eq!(google.queries_made(), 1);
}

#[tokio::test]
async fn test_terminal_status_is_not_retried() {
    let server = MockServer::start().await;
    set_credentials("GCSE_FORBIDDEN_KEY", "GCSE_FORBIDDEN_CX");

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let mut google = provider(
        &server,
        fast_provider_settings("GCSE_FORBIDDEN_KEY", "GCSE_FORBIDDEN_CX"),
    );

    assert!(google.query("landscaping", 10).await.is_empty());
    assert_eq!(google.queries_made(), 1);
}

#[tokio::test]
async fn test_quota_is_a_hard_ceiling() {
    let server = MockServer::start().await;
    set_credentials("GCSE_QUOTA_KEY", "GCSE_QUOTA_CX");

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(cse_body(&["https://first.com".to_string()])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let settings = ProviderSettings {
        daily_quota_threshold: 1,
        ..fast_provider_settings("GCSE_QUOTA_KEY", "GCSE_QUOTA_CX")
    };
    let mut google = provider(&server, settings);

    assert_eq!(google.query("first", 10).await, vec!["https://first.com"]);
    assert_eq!(google.queries_made(), 1);
    assert!(!google.can_continue());

    let (_guard, logs) = capture_logs();
    assert!(google.query("second", 10).await.is_empty());
    assert_eq!(google.queries_made(), 1);

    let logs = logs.contents();
    assert!(logs.contains("search skipped"), "{}", logs);
    assert!(logs.contains("error_code=\"quota\""), "{}", logs);
}

#[tokio::test]
async fn test_missing_credentials_make_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cse_body(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let mut google = provider(
        &server,
        fast_provider_settings("GCSE_ABSENT_KEY", "GCSE_ABSENT_CX"),
    );

    assert!(!google.has_credentials());
    assert!(google.query("painters", 10).await.is_empty());
    assert_eq!(google.queries_made(), 1);
}

#[tokio::test]
async fn test_malformed_body_gives_up_without_retry() {
    let server = MockServer::start().await;
    set_credentials("GCSE_MALFORMED_KEY", "GCSE_MALFORMED_CX");

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let mut google = provider(
        &server,
        fast_provider_settings("GCSE_MALFORMED_KEY", "GCSE_MALFORMED_CX"),
    );

    assert!(google.query("movers", 10).await.is_empty());
    assert_eq!(google.queries_made(), 1);
}

// real clock: the mock server does socket I/O, which paused time would skip past
#[tokio::test]
async fn test_rate_limiter_paces_every_page() {
    let server = MockServer::start().await;
    set_credentials("GCSE_PACED_KEY", "GCSE_PACED_CX");

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cse_body(&links("paced", 10))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("start", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cse_body(&links("more", 10))))
        .expect(1)
        .mount(&server)
        .await;

    let mut google = provider(
        &server,
        ProviderSettings {
            rate_limit_rps: 2.0,
            jitter_percent: 0.0,
            ..fast_provider_settings("GCSE_PACED_KEY", "GCSE_PACED_CX")
        },
    );

    let started = std::time::Instant::now();
    let urls = google.query("electricians", 20).await;
    let elapsed = started.elapsed();

    assert_eq!(urls.len(), 20);
    assert_eq!(google.queries_made(), 1);
    // two 0.5s waits, one per page
    assert!(elapsed >= std::time::Duration::from_millis(1000), "{:?}", elapsed);
    assert!(elapsed < std::time::Duration::from_millis(1500), "{:?}", elapsed);
}
