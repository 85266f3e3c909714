use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pricefinder_app::{AppState, PriceFinderServer};
use pricefinder_search::provider::{SerpApiConfig, SerpApiProvider};
use pricefinder_search::{SearchConfig, SearchOrchestrator};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn shopping_payload() -> Value {
    json!({
        "shopping_results": [
            { "title": "Logitech MX Master 3S", "price": "$99.99", "source": "Best Buy" },
            { "title": "Razer DeathAdder", "price": "$49.99", "source": "Amazon.com" },
            { "title": "No-name mouse", "price": "$2.50", "source": "Temu" },
            { "title": "Extra item", "price": "$9.99", "source": "Walmart" }
        ]
    })
}

async fn provider_mock(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_json(shopping_payload()),
        )
        .mount(&server)
        .await;
    server
}

fn state_for(provider: &MockServer) -> AppState {
    let provider = SerpApiProvider::new(SerpApiConfig {
        api_key: Some("serp-test-key".into()),
        base_url: provider.uri(),
        pacing: Duration::ZERO,
        read_timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap();
    let orchestrator = SearchOrchestrator::new(SearchConfig::default())
        .unwrap()
        .with_provider(Arc::new(provider));
    AppState::new(Arc::new(orchestrator))
}

async fn start(state: AppState) -> (PriceFinderServer, String) {
    let server = PriceFinderServer::start(state, "127.0.0.1", 0).await.unwrap();
    let base = format!("http://{}", server.addr());
    (server, base)
}

fn assert_security_headers(response: &reqwest::Response) {
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cache-control"], "no-cache, no-store, must-revalidate");
}

#[tokio::test]
async fn empty_input_is_rejected() {
    let mock = provider_mock(Duration::ZERO).await;
    let (server, base) = start(state_for(&mock)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({ "query": "   " }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_security_headers(&response);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("required"));
    server.shutdown().await;
}

#[tokio::test]
async fn text_search_returns_sorted_products() {
    let mock = provider_mock(Duration::ZERO).await;
    let (server, base) = start(state_for(&mock)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({ "query": "wireless mouse" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_security_headers(&response);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["search_source"], "text");
    assert_eq!(body["cached"], false);

    let products = body["products"].as_array().unwrap();
    assert_eq!(body["total"], products.len());
    assert!(products.len() <= 6);
    let stores: Vec<_> = products.iter().map(|p| p["store"].as_str().unwrap()).collect();
    assert_eq!(stores, ["Amazon.com", "Best Buy"]);
    let prices: Vec<f64> = products
        .iter()
        .map(|p| p["price_numeric"].as_f64().unwrap())
        .collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    server.shutdown().await;
}

#[tokio::test]
async fn repeated_search_reports_cache_hit() {
    let mock = provider_mock(Duration::ZERO).await;
    let (server, base) = start(state_for(&mock)).await;
    let client = reqwest::Client::new();

    for expected in [false, true] {
        let body: Value = client
            .post(format!("{base}/api/search"))
            .json(&json!({ "query": "wireless mouse" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["cached"], expected);
    }
    server.shutdown().await;
}

#[tokio::test]
async fn slow_search_answers_with_examples_within_budget() {
    let mock = provider_mock(Duration::from_secs(3)).await;
    let mut state = state_for(&mock);
    state.request_timeout = Duration::from_millis(200);
    let (server, base) = start(state).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({ "query": "gaming laptop" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["search_source"], "example");
    assert_eq!(body["total"], 3);
    server.shutdown().await;
}

#[tokio::test]
async fn image_without_vision_falls_back_to_text() {
    let mock = provider_mock(Duration::ZERO).await;
    let (server, base) = start(state_for(&mock)).await;

    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(32, 32, image::Rgb([10, 20, 30])));
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).unwrap();
    let payload = format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner()));

    let body: Value = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({ "query": "wireless mouse", "image_base64": payload }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["search_source"], "text");
    server.shutdown().await;
}

#[tokio::test]
async fn invalid_base64_is_rejected() {
    let mock = provider_mock(Duration::ZERO).await;
    let (server, base) = start(state_for(&mock)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({ "image_base64": "%%% not base64 %%%" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    server.shutdown().await;
}

#[tokio::test]
async fn malformed_json_is_a_json_error() {
    let mock = provider_mock(Duration::ZERO).await;
    let (server, base) = start(state_for(&mock)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    server.shutdown().await;
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let mock = provider_mock(Duration::ZERO).await;
    let mut state = state_for(&mock);
    state.max_body_bytes = 1024;
    let (server, base) = start(state).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({ "query": "x".repeat(4096) }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 413);
    server.shutdown().await;
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let mock = provider_mock(Duration::ZERO).await;
    let (server, base) = start(state_for(&mock)).await;

    let response = reqwest::get(format!("{base}/nope")).await.unwrap();

    assert_eq!(response.status(), 404);
    assert_security_headers(&response);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    server.shutdown().await;
}

#[tokio::test]
async fn health_reports_collaborators() {
    let mock = provider_mock(Duration::ZERO).await;
    let (server, base) = start(state_for(&mock)).await;

    let response = reqwest::get(format!("{base}/api/health")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_security_headers(&response);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["serpapi"], "enabled");
    assert_eq!(body["vision"], "disabled");
    assert!(body["timestamp"].as_str().is_some());
    server.shutdown().await;
}
