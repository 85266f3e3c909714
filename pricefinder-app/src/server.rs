//! JSON HTTP boundary for the search pipeline.
//!
//! `POST /api/search` accepts `{ "query"?, "image_base64"? }` and always
//! answers with listings unless the input itself is unusable (400).
//! `GET /api/health` reports which collaborators are configured. Every
//! response carries the security headers set by [`security_headers`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pricefinder_common::query_fingerprint;
use pricefinder_search::{Listing, SearchError, SearchOrchestrator, SearchOutcome, SearchRequest, SearchSource};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SearchOrchestrator>,
    /// Wall-clock budget for one search before the example set is served.
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(orchestrator: Arc<SearchOrchestrator>) -> Self {
        Self {
            orchestrator,
            request_timeout: Duration::from_secs(20),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub query: Option<String>,
    /// Raw base64 or a `data:<mime>;base64,` URI.
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub products: Vec<Listing>,
    pub total: usize,
    pub search_source: SearchSource,
    pub cached: bool,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            success: true,
            total: outcome.listings.len(),
            products: outcome.listings,
            search_source: outcome.source,
            cached: outcome.cached,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Input(msg) => Self::bad_request(msg),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: other.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

/// Decode an uploaded image; an empty payload means "no image".
pub fn decode_image(payload: &str) -> std::result::Result<Option<Vec<u8>>, ApiError> {
    let trimmed = payload.trim();
    let data = match trimmed.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => trimmed,
    };
    if data.is_empty() {
        return Ok(None);
    }
    STANDARD
        .decode(data)
        .map(Some)
        .map_err(|_| ApiError::bad_request("image payload is not valid base64"))
}

async fn handle_search(
    State(state): State<AppState>,
    body: std::result::Result<Json<SearchBody>, JsonRejection>,
) -> std::result::Result<Json<SearchResponse>, ApiError> {
    let Json(body) = body?;
    let image = match body.image_base64.as_deref() {
        Some(payload) => decode_image(payload)?,
        None => None,
    };
    let request = state.orchestrator.validate_request(SearchRequest {
        text: body.query,
        image,
    })?;

    let started = Instant::now();
    let fingerprint = request.trimmed_text().map(query_fingerprint);
    let outcome =
        match tokio::time::timeout(state.request_timeout, state.orchestrator.search(request.clone()))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    budget_ms = state.request_timeout.as_millis() as u64,
                    query = ?fingerprint,
                    "api.search.timeout"
                );
                state.orchestrator.fallback_outcome(&request)
            }
        };

    tracing::info!(
        query = ?fingerprint,
        image = request.has_image(),
        source = %outcome.source,
        total = outcome.listings.len(),
        cached = outcome.cached,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "api.search.done"
    );
    Ok(Json(SearchResponse::from(outcome)))
}

fn flag(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

/// Health payload shared by the HTTP route and the CLI.
pub fn health_body(orchestrator: &SearchOrchestrator) -> Value {
    json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "serpapi": flag(orchestrator.provider_configured()),
        "vision": flag(orchestrator.vision_configured()),
        "vision_model": orchestrator.vision_model(),
    })
}

async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    Json(health_body(&state.orchestrator))
}

async fn handle_not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: "not found".into(),
    }
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    response
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/api/search", post(handle_search))
        .route("/api/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

/// HTTP server running in a background task.
pub struct PriceFinderServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl PriceFinderServer {
    /// Bind `host:port` (port `0` picks a free one) and start serving.
    pub async fn start(state: AppState, host: &str, port: u16) -> Result<Self> {
        let bind_addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("binding {bind_addr}"))?;
        let addr = listener.local_addr().context("reading bound address")?;
        tracing::info!(%addr, "server.listening");

        let (tx, rx) = oneshot::channel::<()>();
        let app = build_router(state);
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                tracing::error!(error = %e, "server.failed");
            }
        });

        Ok(Self {
            addr,
            shutdown: Some(tx),
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!(error = %e, "server.join_failed");
        }
        tracing::info!("server.stopped");
    }
}

impl Drop for PriceFinderServer {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.handle.abort();
        }
    }
}
