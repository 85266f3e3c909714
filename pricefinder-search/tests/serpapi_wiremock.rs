use std::time::Duration;

use pricefinder_search::provider::{SerpApiConfig, SerpApiProvider, ShoppingProvider};
use pricefinder_search::{SearchConfig, SearchError, SearchOrchestrator, SearchRequest, SearchSource};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> SerpApiProvider {
    SerpApiProvider::new(SerpApiConfig {
        api_key: Some("serp-test-key".into()),
        base_url: server.uri(),
        pacing: Duration::ZERO,
        read_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn request_carries_every_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("engine", "google_shopping"))
        .and(query_param("q", "\"usb hub\" buy online"))
        .and(query_param("api_key", "serp-test-key"))
        .and(query_param("num", "5"))
        .and(query_param("location", "United States"))
        .and(query_param("gl", "us"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "shopping_results": [{ "title": "Anker USB hub", "price": "$24.99", "source": "Target" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider_for(&server)
        .search("google_shopping", "\"usb hub\" buy online")
        .await
        .unwrap();
    let items = response.items("google_shopping");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].store().as_deref(), Some("Target"));
}

#[tokio::test]
async fn non_success_status_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid API key." })))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .search("google_shopping", "anything")
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Provider(_)), "{err}");
    assert!(!err.to_string().contains("serp-test-key"));
}

#[tokio::test]
async fn error_payload_with_ok_status_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Google hasn't returned any results for this query."
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .search("google_shopping", "zzzz")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("hasn't returned any results"));
}

#[tokio::test]
async fn malformed_body_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .search("google_shopping", "mouse")
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Provider(_)));
}

#[tokio::test]
async fn transport_failure_is_a_provider_error() {
    let server = MockServer::start().await;
    let provider = provider_for(&server);
    drop(server);

    let err = provider.search("google_shopping", "mouse").await.unwrap_err();
    assert!(matches!(err, SearchError::Provider(_)));
}

#[tokio::test]
async fn slow_provider_times_out_and_degrades_to_examples() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({ "shopping_results": [] })),
        )
        .mount(&server)
        .await;

    let provider = SerpApiProvider::new(SerpApiConfig {
        api_key: Some("k".into()),
        base_url: server.uri(),
        pacing: Duration::ZERO,
        read_timeout: Duration::from_millis(200),
        ..Default::default()
    })
    .unwrap();
    let orch = SearchOrchestrator::new(SearchConfig::default())
        .unwrap()
        .with_provider(std::sync::Arc::new(provider));

    let outcome = orch.search(SearchRequest::text("coffee grinder")).await;
    assert_eq!(outcome.listings.len(), 3);
    assert!(outcome
        .listings
        .iter()
        .all(|l| l.search_source == SearchSource::Example));
}

#[tokio::test]
async fn end_to_end_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "\"water bottle\" buy online"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "shopping_results": [
                { "title": "Hydro Flask 32 oz", "price": "$44.95", "source": "REI" },
                { "title": "Owala FreeSip 24 oz", "price": "Check site", "source": "Target" },
                { "title": "Stanley Quencher", "price": "$35.00", "source": "Wish" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orch = SearchOrchestrator::new(SearchConfig::default())
        .unwrap()
        .with_provider(std::sync::Arc::new(provider_for(&server)));

    let outcome = orch.search(SearchRequest::text("water bottle")).await;
    let summary: Vec<_> = outcome
        .listings
        .iter()
        .map(|l| (l.store.as_str(), l.price_numeric))
        .collect();
    assert_eq!(summary, [("Target", 28.75), ("REI", 44.95)]);
    assert_eq!(outcome.listings[0].price, "$28.75");
    assert_eq!(
        outcome.listings[0].link,
        "https://www.google.com/search?tbm=shop&q=Owala+FreeSip+24+oz"
    );

    let again = orch.search(SearchRequest::text("water bottle")).await;
    assert!(again.cached);
}
