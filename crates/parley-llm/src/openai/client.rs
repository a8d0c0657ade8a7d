// OpenAI-compatible client implementation

use crate::config::OpenAIConfig;
use crate::error::{LlmError, Result};
use crate::traits::{ByteStream, ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
use crate::types::ChatMessage;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Client for an OpenAI-compatible `/chat/completions` endpoint (HTTP direct, no SDK)
pub struct OpenAIClient {
    http_client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIClient {
    /// Create a client for the configured endpoint
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/event-stream, application/json"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        if let Some(api_key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| LlmError::Config("Invalid API key format".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Build chat completion request payload
    fn build_chat_request<'a>(
        model: &'a str,
        messages: &'a [ChatMessage],
        options: &ChatOptions,
        stream: bool,
    ) -> CompletionBody<'a> {
        CompletionBody {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream,
        }
    }

    async fn post(&self, body: &CompletionBody<'_>) -> Result<reqwest::Response> {
        let url = self.config.completions_url();
        tracing::debug!(
            url = %url,
            model = body.model,
            messages = body.messages.len(),
            stream = body.stream,
            "Sending completion request"
        );

        let response = self.http_client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status, body = %error_text, "Completion endpoint returned an error");
            return Err(LlmError::Http {
                status,
                body: error_text,
            });
        }

        Ok(response)
    }
}

// ============================================================================
// TRAIT IMPLEMENTATIONS
// ============================================================================

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let body = Self::build_chat_request(
            &request.model,
            &request.messages,
            &request.options,
            false,
        );

        let response = self.post(&body).await?;

        let text = response.text().await?;
        let raw: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        let parsed: CompletionResponse = serde_json::from_value(raw.clone())
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let choice = parsed.choices.into_iter().next();
        Ok(ChatResponse {
            content: choice.as_ref().and_then(|c| c.message.content.clone()),
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.and_then(|c| c.finish_reason),
            raw,
        })
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<ByteStream> {
        let body = Self::build_chat_request(
            &request.model,
            &request.messages,
            &request.options,
            true,
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            response = self.post(&body) => response?,
        };

        let mut bytes = Box::pin(response.bytes_stream());

        Ok(Box::pin(async_stream::stream! {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => NextChunk::Cancelled,
                    chunk = bytes.next() => NextChunk::Received(chunk),
                };

                match next {
                    NextChunk::Cancelled => {
                        yield Err(LlmError::Cancelled);
                        break;
                    }
                    NextChunk::Received(Some(Ok(chunk))) => yield Ok(chunk),
                    NextChunk::Received(Some(Err(e))) => {
                        yield Err(LlmError::Network(e));
                        break;
                    }
                    NextChunk::Received(None) => break,
                }
            }
        }))
    }
}

enum NextChunk {
    Cancelled,
    Received(Option<reqwest::Result<bytes::Bytes>>),
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i64>,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
