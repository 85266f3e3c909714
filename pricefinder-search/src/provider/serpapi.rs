use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use pricefinder_http::{ApiKey, HttpClient, RequestOpts};
use serde_json::Value;

use super::ShoppingProvider;
use crate::error::{Result, SearchError};
use crate::types::RawResponse;

/// SerpAPI request parameters and budgets.
#[derive(Debug, Clone)]
pub struct SerpApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub num: u32,
    pub location: String,
    pub gl: String,
    /// Fixed delay before every request.
    pub pacing: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for SerpApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://serpapi.com".into(),
            num: 5,
            location: "United States".into(),
            gl: "us".into(),
            pacing: Duration::from_millis(300),
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(8),
        }
    }
}

pub struct SerpApiProvider {
    http: HttpClient,
    config: SerpApiConfig,
}

impl SerpApiProvider {
    pub fn new(config: SerpApiConfig) -> Result<Self> {
        let http = HttpClient::with_connect_timeout(&config.base_url, config.connect_timeout)
            .map_err(|e| SearchError::Config(format!("SerpAPI base URL: {e}")))?
            .with_timeout(config.read_timeout);
        Ok(Self { http, config })
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[async_trait]
impl ShoppingProvider for SerpApiProvider {
    async fn search(&self, engine: &str, query: &str) -> Result<RawResponse> {
        let api_key = self
            .api_key()
            .ok_or_else(|| SearchError::Provider("no SerpAPI key configured".into()))?;

        if !self.config.pacing.is_zero() {
            tokio::time::sleep(self.config.pacing).await;
        }

        let num = self.config.num.to_string();
        let opts = RequestOpts {
            query: vec![
                ("engine", Cow::Borrowed(engine)),
                ("q", Cow::Borrowed(query)),
                ("num", Cow::Owned(num)),
                ("location", Cow::Borrowed(self.config.location.as_str())),
                ("gl", Cow::Borrowed(self.config.gl.as_str())),
            ],
            api_key: Some(ApiKey::new("api_key", api_key)),
        };

        let payload: Value = self.http.get_json("search", opts).await?;
        let response = RawResponse::new(payload);
        if let Some(message) = response.error_message() {
            return Err(SearchError::Provider(message.to_string()));
        }
        Ok(response)
    }

    fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_not_configured() {
        let provider = SerpApiProvider::new(SerpApiConfig {
            api_key: Some("   ".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    async fn search_without_key_fails_fast() {
        let provider = SerpApiProvider::new(SerpApiConfig::default()).unwrap();
        let err = provider.search("google_shopping", "mouse").await.unwrap_err();
        assert!(matches!(err, SearchError::Provider(_)));
    }
}
