// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use leadgen_audit::utils::robots::{RobotsDecision, RobotsPolicy};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn policy() -> RobotsPolicy {
    RobotsPolicy::new().with_scheme("http")
}

#[tokio::test]
async fn test_crawl_delay_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .and(header("User-Agent", "LeadGen-Audit-Discover/1.0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\nCrawl-delay: 2.5\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let decision = policy().check(&server.address().to_string()).await;

    assert!(decision.allowed);
    assert_eq!(decision.crawl_delay, Some(Duration::from_millis(2500)));
}

#[tokio::test]
async fn test_missing_robots_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let decision = policy().check(&server.address().to_string()).await;
    assert_eq!(decision, RobotsDecision::allow_all());
}

#[tokio::test]
async fn test_server_error_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Crawl-delay: 9"))
        .mount(&server)
        .await;

    let decision = policy().check(&server.address().to_string()).await;
    assert_eq!(decision, RobotsDecision::allow_all());
}

#[tokio::test]
async fn test_unreachable_host_fails_open() {
    // nothing listens on the discard port
    let decision = policy().check("127.0.0.1:9").await;
    assert_eq!(decision, RobotsDecision::allow_all());
}

#[tokio::test]
async fn test_disallow_is_reported_not_enforced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;

    let decision = policy().check(&server.address().to_string()).await;
    assert!(!decision.allowed);
    assert_eq!(decision.crawl_delay, None);
}

#[tokio::test]
async fn test_zero_crawl_delay_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Crawl-delay: 0\n"))
        .mount(&server)
        .await;

    let decision = policy().check(&server.address().to_string()).await;
    assert!(decision.allowed);
    assert_eq!(decision.crawl_delay, None);
}
