/// LLM client: the single point of entry for all completion API calls.
///
/// No other module may call the provider directly; handlers depend on the
/// `Completer` trait so tests can substitute a canned implementation.
///
/// Model: gpt-3.5-turbo (hardcoded, not configurable)
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// The model used for all completions.
pub const MODEL: &str = "gpt-3.5-turbo";
/// Roughly 200 words of output.
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.7;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}, code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM API key is not configured")]
    NotConfigured,
}

/// Caller-facing classification of provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    QuotaExceeded,
    RateLimited,
    AccessDenied,
    InvalidApiKey,
    NotConfigured,
    Other,
}

impl UpstreamKind {
    pub fn code(&self) -> &'static str {
        match self {
            UpstreamKind::QuotaExceeded => "QUOTA_EXCEEDED",
            UpstreamKind::RateLimited => "RATE_LIMITED",
            UpstreamKind::AccessDenied => "ACCESS_DENIED",
            UpstreamKind::InvalidApiKey => "INVALID_API_KEY",
            UpstreamKind::NotConfigured => "LLM_NOT_CONFIGURED",
            UpstreamKind::Other => "LLM_ERROR",
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            UpstreamKind::QuotaExceeded => "The AI provider quota has been exhausted",
            UpstreamKind::RateLimited => "The AI provider is rate limiting requests, try again shortly",
            UpstreamKind::AccessDenied => "The AI provider denied access to the model",
            UpstreamKind::InvalidApiKey => "The AI provider rejected the configured API key",
            UpstreamKind::NotConfigured => "The AI provider API key is not configured",
            UpstreamKind::Other => "Failed to generate AI response",
        }
    }
}

impl LlmError {
    pub fn kind(&self) -> UpstreamKind {
        match self {
            LlmError::NotConfigured => UpstreamKind::NotConfigured,
            LlmError::Api { status, code, .. } => match (*status, code.as_deref()) {
                (_, Some("insufficient_quota")) => UpstreamKind::QuotaExceeded,
                (_, Some("invalid_api_key")) | (401, _) => UpstreamKind::InvalidApiKey,
                (429, _) | (_, Some("rate_limit_exceeded")) => UpstreamKind::RateLimited,
                (403, _) | (_, Some("model_not_found")) => UpstreamKind::AccessDenied,
                _ => UpstreamKind::Other,
            },
            _ => UpstreamKind::Other,
        }
    }
}

/// Anything that can turn a system + user prompt into answer text.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Trimmed text of the first choice, if any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    code: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

/// Wraps the chat-completions API with retry on transport and 5xx failures.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(api_key: Option<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            api_key,
        })
    }

    /// Makes a raw call, returning the full response object.
    /// Retries transport errors and 5xx with exponential backoff. 4xx responses
    /// (including 429, which also signals exhausted quota) return immediately.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<ChatResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let request_body = ChatRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(OPENAI_API_URL)
                .bearer_auth(api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    code: None,
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(parse_api_error(status.as_u16(), body));
            }

            let chat: ChatResponse = response.json().await?;

            if let Some(usage) = &chat.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat);
        }

        Err(last_error.unwrap_or(LlmError::EmptyContent))
    }
}

#[async_trait]
impl Completer for LlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let response = self.call(prompt, system).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Builds an `LlmError::Api` from a non-success body, preferring the
/// provider's structured `error.code` (falling back to `error.type`).
fn parse_api_error(status: u16, body: String) -> LlmError {
    match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => LlmError::Api {
            status,
            code: envelope.error.code.or(envelope.error.error_type),
            message: envelope.error.message,
        },
        Err(_) => LlmError::Api {
            status,
            code: None,
            message: body,
        },
    }
}
