use super::reply::ReplyEnvelope;
use crate::config::GatewayConfig;
use crate::util::{sanitize_api_response, truncate_str};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Maximum length of provider messages surfaced to callers
const MAX_PROVIDER_MESSAGE_LEN: usize = 200;

/// A multimodal chat-completion request (OpenAI-compatible wire shape)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// OpenRouter extension: requested output modalities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
    /// OpenRouter extension for image-capable models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

impl ChatRequest {
    /// Single user turn made of the given parts.
    pub fn user(model: impl Into<String>, parts: Vec<ContentPart>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: parts,
            }],
            modalities: None,
            image_config: None,
        }
    }

    /// Ask for image + text output with the given framing.
    pub fn with_image_output(mut self, image_config: ImageConfig) -> Self {
        self.modalities = Some(vec!["image".to_string(), "text".to_string()]);
        self.image_config = Some(image_config);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrlRef },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrlRef { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrlRef {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

/// The remote call itself failed (transport, HTTP status, or provider-reported error)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Anything that can answer a chat-completion request.
#[async_trait]
pub trait ChatGateway: Send + Sync + 'static {
    async fn complete(&self, request: &ChatRequest) -> Result<ReplyEnvelope, UpstreamError>;
}

/// Gateway backed by an OpenAI-compatible HTTP endpoint (OpenRouter by default)
pub struct HttpChatGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpChatGateway {
    /// No request timeout is set; the transport default applies.
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[async_trait]
impl ChatGateway for HttpChatGateway {
    async fn complete(&self, request: &ChatRequest) -> Result<ReplyEnvelope, UpstreamError> {
        let url = self.config.chat_completions_url();
        tracing::debug!(model = %request.model, %url, "sending chat completion");

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request);
        for (name, value) in &self.config.default_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::new(None, format!("Request to model provider failed: {}", e)))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            UpstreamError::new(
                Some(status.as_u16()),
                format!("Failed to read model provider response: {}", e),
            )
        })?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "model provider returned an error status");
            return Err(error_from_status(status.as_u16(), &text));
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            UpstreamError::new(
                Some(status.as_u16()),
                format!(
                    "Failed to parse model provider response: {} ({})",
                    e,
                    sanitize_api_response(&text)
                ),
            )
        })?;

        // OpenRouter relays upstream provider faults inside a 200 response.
        if let Some(err) = provider_error(&body) {
            tracing::warn!(status = ?err.status, "model provider reported an error");
            return Err(err);
        }

        Ok(ReplyEnvelope::from_completion(&body))
    }
}

/// `{"error": {"message": ..., "code": ...}}` as sent by OpenAI-compatible providers
fn provider_error(body: &Value) -> Option<UpstreamError> {
    let error = body.get("error")?;
    if error.is_null() {
        return None;
    }
    let message = match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    };
    let status = error
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok());
    Some(UpstreamError::new(
        status,
        truncate_str(&message, MAX_PROVIDER_MESSAGE_LEN).to_string(),
    ))
}

fn error_from_status(status: u16, text: &str) -> UpstreamError {
    if let Some(mut err) = serde_json::from_str::<Value>(text)
        .ok()
        .as_ref()
        .and_then(provider_error)
    {
        err.status = Some(status);
        return err;
    }

    let message = match status {
        401 => "Model provider rejected the API key (401). Check LLM_API_KEY.".to_string(),
        429 => "Rate limited by the model provider (429). Try again in a few minutes.".to_string(),
        500..=599 => format!(
            "Model provider server error ({}). The service may be temporarily unavailable.",
            status
        ),
        _ => format!("API error {}: {}", status, sanitize_api_response(text)),
    };
    UpstreamError::new(Some(status), message)
}
