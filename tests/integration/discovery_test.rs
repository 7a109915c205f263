// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use leadgen_audit::config::settings::{DiscoverySettings, ProviderSettings};
use leadgen_audit::domain::search::engine::SearchError;
use leadgen_audit::domain::services::discovery_service::DiscoveryEngine;
use leadgen_audit::infrastructure::search::duckduckgo::{
    DuckDuckGoProvider, TextHit, TextSearchBackend,
};
use leadgen_audit::infrastructure::search::google_cse::GoogleCseProvider;
use leadgen_audit::infrastructure::search::{ProviderSelection, SearchProviderFactory};
use leadgen_audit::utils::artifacts::write_domains;
use leadgen_audit::utils::errors::ConfigurationError;
use leadgen_audit::utils::robots::{RobotsDecision, RobotsPolicy};
use std::collections::{BTreeMap, HashMap};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::{cse_body, fast_provider_settings, set_credentials};

struct StaticBackend {
    results: HashMap<String, Vec<String>>,
}

#[async_trait]
impl TextSearchBackend for StaticBackend {
    async fn text(&self, keyword: &str, max_results: usize) -> Result<Vec<TextHit>, SearchError> {
        Ok(self
            .results
            .get(keyword)
            .into_iter()
            .flatten()
            .take(max_results)
            .map(|url| TextHit::from_href(url.clone()))
            .collect())
    }
}

fn keywords(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_discovery_across_both_providers() {
    let server = MockServer::start().await;
    set_credentials("DISCOVERY_KEY", "DISCOVERY_CX");

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "plumber"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cse_body(&[
            "https://www.Plumb-Pros.com/about".to_string(),
            "http://127.0.0.1/admin".to_string(),
            "https://drains.net:8443/".to_string(),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "dentist"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let google = GoogleCseProvider::new(ProviderSettings {
        retry_attempts: 2,
        ..fast_provider_settings("DISCOVERY_KEY", "DISCOVERY_CX")
    })
    .with_endpoint(format!("{}/customsearch/v1", server.uri()));

    let backend = StaticBackend {
        results: HashMap::from([
            (
                "plumber".to_string(),
                vec!["https://plumb-pros.com".to_string(), "localhost".to_string()],
            ),
            (
                "dentist".to_string(),
                vec![
                    "https://smiles.io/book".to_string(),
                    "https://www.smiles.io".to_string(),
                    "invalid".to_string(),
                ],
            ),
        ]),
    };
    let ddg = DuckDuckGoProvider::from_parts(
        fast_provider_settings("UNUSED_KEY", "UNUSED_CX"),
        Box::new(backend),
        RobotsDecision::allow_all(),
    );

    let mut engine = DiscoveryEngine::new(vec![Box::new(google), Box::new(ddg)]);
    let report = engine.run(&keywords(&["plumber", "dentist"]), 10).await;

    assert_eq!(report.domains, vec!["drains.net", "plumb-pros.com", "smiles.io"]);

    let google_usage = report.usage.get("google_cse").unwrap();
    assert_eq!(google_usage.queries_made, 2);
    assert_eq!(google_usage.domains, 2);
    let ddg_usage = report.usage.get("duckduckgo").unwrap();
    assert_eq!(ddg_usage.queries_made, 2);
    assert_eq!(ddg_usage.domains, 2);

    let json: serde_json::Value = serde_json::from_str(&report.usage.to_json()).unwrap();
    assert_eq!(json["google_cse"]["queries_made"], 2);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("nested").join("domains.txt");
    write_domains(&output, &report.domains).unwrap();
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "drains.net\nplumb-pros.com\nsmiles.io\n"
    );
}

#[tokio::test]
async fn test_quota_bounded_provider_stops_early() {
    let server = MockServer::start().await;
    set_credentials("DISCOVERY_QUOTA_KEY", "DISCOVERY_QUOTA_CX");

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(cse_body(&["https://only.com".to_string()])),
        )
        .expect(2)
        .mount(&server)
        .await;

    let google = GoogleCseProvider::new(ProviderSettings {
        daily_quota_threshold: 2,
        ..fast_provider_settings("DISCOVERY_QUOTA_KEY", "DISCOVERY_QUOTA_CX")
    })
    .with_endpoint(format!("{}/customsearch/v1", server.uri()));

    let mut engine = DiscoveryEngine::new(vec![Box::new(google)]);
    let report = engine.run(&keywords(&["a", "b", "c", "d"]), 10).await;

    assert_eq!(report.domains, vec!["only.com"]);
    assert_eq!(report.usage.get("google_cse").unwrap().queries_made, 2);
}

fn discovery_settings(providers: &[(&str, ProviderSettings)]) -> DiscoverySettings {
    DiscoverySettings {
        keywords: keywords(&["k"]),
        providers: providers
            .iter()
            .map(|(name, settings)| (name.to_string(), settings.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

#[tokio::test]
async fn test_factory_honours_selection() {
    let settings = discovery_settings(&[]);
    let providers = SearchProviderFactory::create_providers(
        &settings,
        ProviderSelection::Google,
        &RobotsPolicy::new(),
    )
    .await
    .unwrap();

    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].name(), "google_cse");
}

#[tokio::test]
async fn test_factory_without_enabled_providers() {
    let disabled = ProviderSettings {
        enabled: false,
        ..ProviderSettings::default()
    };
    let settings = discovery_settings(&[("google_cse", disabled)]);

    let result = SearchProviderFactory::create_providers(
        &settings,
        ProviderSelection::Google,
        &RobotsPolicy::new(),
    )
    .await;

    assert!(matches!(result, Err(ConfigurationError::NoProviders)));
}
