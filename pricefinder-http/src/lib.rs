//! Small JSON-over-HTTP client shared by the SerpAPI and Gemini clients.
//!
//! One request is one attempt: send, check the status, decode. Callers own
//! their failure policy, and the search pipeline never retries.
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), pricefinder_http::HttpError> {
//! use std::borrow::Cow;
//! use pricefinder_http::{ApiKey, HttpClient, RequestOpts};
//!
//! let client = HttpClient::new("https://serpapi.com")?;
//! let got: serde_json::Value = client
//!     .get_json(
//!         "search",
//!         RequestOpts {
//!             query: vec![("engine", Cow::Borrowed("google_shopping"))],
//!             api_key: Some(ApiKey::new("api_key", "secret")),
//!         },
//!     )
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! The API key rides as a query parameter. Its value is replaced with
//! `<redacted>` before the parameter list reaches a log line.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const SNIPPET_MAX: usize = 500;
const REDACTED: &str = "<redacted>";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for [`HttpError::Api`] failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Credential sent as a query parameter (SerpAPI `api_key`, Gemini `key`).
#[derive(Clone, Debug)]
pub struct ApiKey<'a> {
    pub param: &'a str,
    pub value: Cow<'a, str>,
}

impl<'a> ApiKey<'a> {
    pub fn new(param: &'a str, value: impl Into<Cow<'a, str>>) -> Self {
        Self {
            param,
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub query: Vec<(&'a str, Cow<'a, str>)>,
    pub api_key: Option<ApiKey<'a>>,
}

impl RequestOpts<'_> {
    /// Parameters as logged: the key's value never appears.
    fn loggable_query(&self) -> Vec<(String, String)> {
        let mut shown: Vec<(String, String)> = self
            .query
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.to_string()))
            .collect();
        if let Some(key) = &self.api_key {
            shown.push((key.param.to_string(), REDACTED.to_string()));
        }
        shown
    }

    fn wire_query(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self.query.iter().map(|(k, v)| (*k, v.as_ref())).collect();
        if let Some(key) = &self.api_key {
            pairs.push((key.param, key.value.as_ref()));
        }
        pairs
    }
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Client anchored to `base` with a 5 s connect and 15 s overall budget.
    pub fn new(base: &str) -> Result<Self, HttpError> {
        Self::with_connect_timeout(base, DEFAULT_CONNECT_TIMEOUT)
    }

    /// The connect budget lives in the connection pool, so it is fixed per client.
    pub fn with_connect_timeout(base: &str, connect: Duration) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(connect)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Overall budget for one request, from send until the body is read.
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.timeout = dur;
        self
    }

    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json::<(), T>(Method::GET, path, None, opts)
            .await
    }

    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(body), opts)
            .await
    }

    async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;
        let req_id = uuid::Uuid::new_v4().simple().to_string();

        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(self.timeout);
        let pairs = opts.wire_query();
        if !pairs.is_empty() {
            rb = rb.query(&pairs);
        }
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| HttpError::Build(format!("failed to encode request body: {e}")))?;
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }

        tracing::debug!(
            req_id = %req_id,
            method = %method,
            host_path = %format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            query = ?opts.loggable_query(),
            timeout_ms = self.timeout.as_millis() as u64,
            has_body = body.is_some(),
            "http.request.start"
        );

        let started = Instant::now();
        let received = match rb.send().await {
            Ok(resp) => {
                let status = resp.status();
                let request_id = resp
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-")
                    .to_string();
                resp.bytes().await.map(|b| (status, request_id, b))
            }
            Err(err) => Err(err),
        };
        let (status, request_id, bytes) = received.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(
                req_id = %req_id,
                timed_out = err.is_timeout(),
                message = %message,
                "http.network_error"
            );
            if err.is_timeout() {
                HttpError::Timeout(message)
            } else {
                HttpError::Network(message)
            }
        })?;

        tracing::debug!(
            req_id = %req_id,
            %status,
            duration_ms = started.elapsed().as_millis() as u64,
            body_len = bytes.len(),
            x_request_id = %request_id,
            "http.response.headers"
        );

        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(req_id = %req_id, serde_err = %e, "http.response.decode_error");
                HttpError::Decode(e.to_string(), snip_body(&bytes))
            });
        }

        let message = extract_error_message(&bytes);
        tracing::warn!(
            req_id = %req_id,
            %status,
            message = %message,
            x_request_id = %request_id,
            "http.error"
        );
        Err(HttpError::Api {
            status,
            message,
            request_id,
        })
    }
}

// Google nests `{"error":{"message":..}}`; SerpAPI answers `{"error":".."}`.
fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorBody {
        Nested { error: Detail },
        Flat { error: String },
        Message { message: String },
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody::Nested { error }) => error.message,
        Ok(ErrorBody::Flat { error }) | Ok(ErrorBody::Message { message: error }) => error,
        Err(_) => snip_body(body),
    }
}

fn snip_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= SNIPPET_MAX {
        return text.into_owned();
    }
    let mut cut = SNIPPET_MAX;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_value_never_reaches_logs() {
        let opts = RequestOpts {
            query: vec![("q", Cow::Borrowed("usb hub"))],
            api_key: Some(ApiKey::new("api_key", "s3cr3t")),
        };
        let shown = opts.loggable_query();
        assert_eq!(shown[0], ("q".to_string(), "usb hub".to_string()));
        assert_eq!(shown[1], ("api_key".to_string(), REDACTED.to_string()));
        assert_eq!(opts.wire_query()[1], ("api_key", "s3cr3t"));
    }

    #[test]
    fn error_message_prefers_structured_bodies() {
        assert_eq!(
            extract_error_message(br#"{"error":{"message":"API key not valid"}}"#),
            "API key not valid"
        );
        assert_eq!(
            extract_error_message(br#"{"error":"Invalid API key."}"#),
            "Invalid API key."
        );
        assert_eq!(extract_error_message(br#"{"message":"busy"}"#), "busy");
        assert_eq!(extract_error_message(b"Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn snippets_are_capped_on_char_boundaries() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpClient::new("not a url").unwrap_err();
        assert!(matches!(err, HttpError::Url(_)));
    }
}
