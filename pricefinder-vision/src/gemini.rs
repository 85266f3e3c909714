use crate::config::VisionConfig;
use crate::photo::PreparedImage;
use crate::traits::{clean_description, VisionClient};
use async_trait::async_trait;
use pricefinder_common::{PriceFinderError, Result};
use pricefinder_http::{ApiKey, HttpClient, HttpError, RequestOpts};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: GeminiInlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

/// Google Gemini vision client over the shared JSON HTTP client.
///
/// The API key travels as the `key` query parameter, which the HTTP layer
/// redacts from its logs.
pub struct GeminiVisionClient {
    http: HttpClient,
    api_key: String,
    model: String,
}

impl GeminiVisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(PriceFinderError::Config("Gemini API key is empty".into()));
        }
        let http = HttpClient::new(&config.base_url)
            .map_err(|e| PriceFinderError::Config(format!("Gemini base URL: {e}")))?
            .with_timeout(config.timeout);
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn request_opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            api_key: Some(ApiKey::new("key", self.api_key.as_str())),
            ..Default::default()
        }
    }
}

fn map_http_error(err: HttpError) -> PriceFinderError {
    if matches!(err, HttpError::Timeout(_)) {
        return PriceFinderError::Timeout;
    }
    match err.status().map(|s| s.as_u16()) {
        Some(429) => PriceFinderError::Vision("rate limit exceeded".into()),
        Some(401) | Some(403) => PriceFinderError::Vision("API key rejected".into()),
        _ => PriceFinderError::Vision(err.to_string()),
    }
}

#[async_trait]
impl VisionClient for GeminiVisionClient {
    async fn describe(&self, image: &PreparedImage) -> Result<String> {
        let path = format!("v1beta/models/{}:generateContent", self.model);
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text {
                        text: self.product_query_prompt(),
                    },
                    GeminiPart::Inline {
                        inline_data: GeminiInlineData {
                            mime_type: image.mime_type,
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.2,
                max_output_tokens: 64,
            },
        };

        tracing::debug!(
            model = %self.model,
            width = image.width,
            height = image.height,
            "vision.describe.start"
        );

        let response: GeminiResponse = self
            .http
            .post_json_opts(
                &path,
                &request,
                self.request_opts(),
            )
            .await
            .map_err(map_http_error)?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| PriceFinderError::Vision("no candidates returned".into()))?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(PriceFinderError::Vision(
                "content blocked by safety filters".into(),
            ));
        }

        let text = candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| PriceFinderError::Vision("no text in response".into()))?;

        let query = clean_description(&text)
            .ok_or_else(|| PriceFinderError::Vision("empty description".into()))?;
        tracing::info!(
            model = %self.model,
            query_fp = %pricefinder_common::query_fingerprint(&query),
            "vision.describe.ok"
        );
        tracing::trace!(query = %query, "vision.describe.text");
        Ok(query)
    }

    async fn health_check(&self) -> Result<bool> {
        let path = format!("v1beta/models/{}", self.model);
        let probe: std::result::Result<serde_json::Value, _> = self
            .http
            .get_json(
                &path,
                self.request_opts(),
            )
            .await;
        match probe {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_inline_data() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text { text: "describe" },
                    GeminiPart::Inline {
                        inline_data: GeminiInlineData {
                            mime_type: "image/jpeg",
                            data: "QUJD".into(),
                        },
                    },
                ],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.2,
                max_output_tokens: 64,
            },
        };
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "describe");
        assert_eq!(
            v["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/jpeg"
        );
        assert_eq!(v["contents"][0]["parts"][1]["inlineData"]["data"], "QUJD");
        assert_eq!(v["generationConfig"]["maxOutputTokens"], 64);
    }

    #[test]
    fn empty_key_is_a_config_error() {
        let cfg = VisionConfig {
            api_key: "  ".into(),
            ..VisionConfig::default()
        };
        assert!(matches!(
            GeminiVisionClient::new(&cfg),
            Err(PriceFinderError::Config(_))
        ));
    }
}
