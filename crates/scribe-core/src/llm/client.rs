//! Direct provider client for the Agent Loop and synthesis stream, where
//! `tool_use`/`tool_result` turns, `cache_control` block markers, and SSE
//! text deltas are mandatory (§4.3/§4.6/§6) and not exposed by `dspy_rs`.
//! Grounded on the donor's `memory/embedding.rs::EmbeddingService` —
//! same "own `reqwest::Client`, own base_url/api_key/model" shape, scaled
//! up to a chat-completions request/response body.

use std::time::Duration;

use anyhow::{Context, Result};
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde_json::json;

use super::{ContentBlock, LlmResponse, Role, StopReason, ToolDefinition, ToolUse, Turn, Usage};

/// §7 "LLM provider: retryable (429, 503) → exponential backoff". Carries
/// `retryable` through to `CoreError::Provider` so a caller that has
/// already exhausted its own retries still knows whether a later retry
/// would be worth it.
#[derive(Debug)]
pub struct ProviderError {
    pub retryable: bool,
    pub message: String,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.as_u16() == 503
}

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, max_retries: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_retries,
        }
    }

    /// Posts `body` to `/messages`, retrying with exponential backoff on a
    /// 429 or 503 response up to `self.max_retries` times. Grounded on the
    /// donor's `CompactionManager::summarize` retry-loop shape
    /// (`memory/compaction.rs`), adapted from correction-retry to
    /// status-code-gated backoff.
    async fn post_with_retry(&self, body: &serde_json::Value) -> Result<reqwest::Response> {
        let mut attempt = 0u32;
        loop {
            let resp = self
                .http
                .post(format!("{}/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .json(body)
                .send()
                .await
                .context("LLM request failed")?;

            let status = resp.status();
            if status.is_success() {
                return Ok(resp);
            }

            let retryable = is_retryable_status(status);
            if retryable && attempt < self.max_retries {
                let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                tracing::warn!(
                    "LLM provider returned {} (attempt {}/{}), retrying in {:?}",
                    status,
                    attempt + 1,
                    self.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let body_text = resp.text().await.unwrap_or_default();
            return Err(ProviderError {
                retryable,
                message: format!("LLM provider returned {}: {}", status, body_text),
            }
            .into());
        }
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn block_json(block: &ContentBlock) -> serde_json::Value {
        if block.cacheable {
            json!({ "type": "text", "text": block.text, "cache_control": { "type": "ephemeral" } })
        } else {
            json!({ "type": "text", "text": block.text })
        }
    }

    /// One non-streaming request/response round of the agent loop (§4.6
    /// loop contract). `system` blocks are the Context Builder's cacheable
    /// system layer; `messages` is the running turn history including any
    /// injected tool_result turns.
    pub async fn request(
        &self,
        system: &[ContentBlock],
        messages: &[Turn],
        tools: &[ToolDefinition],
        max_tokens: u32,
    ) -> Result<LlmResponse> {
        let system_json: Vec<_> = system.iter().map(Self::block_json).collect();
        let messages_json: Vec<_> = messages
            .iter()
            .map(|turn| {
                json!({
                    "role": Self::role_str(turn.role),
                    "content": turn.blocks.iter().map(Self::block_json).collect::<Vec<_>>(),
                })
            })
            .collect();
        let tools_json: Vec<_> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.input_schema,
                })
            })
            .collect();

        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "system": system_json,
            "messages": messages_json,
            "tools": tools_json,
            "stream": false,
        });

        let resp = self.post_with_retry(&body).await?;
        let payload: serde_json::Value = resp.json().await.context("invalid LLM response body")?;
        parse_response(&payload)
    }

    /// Streaming synthesis call (§4.6 synthesis phase): yields a raw SSE
    /// byte stream of provider events; the Agent Loop turns these into
    /// `text`/`complete` events for the transport layer.
    pub async fn stream_synthesis(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<impl Stream<Item = Result<SynthesisEvent>>> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "system": [{ "type": "text", "text": system_prompt }],
            "messages": [{ "role": "user", "content": [{ "type": "text", "text": user_prompt }] }],
            "stream": true,
        });

        let resp = self.post_with_retry(&body).await?;

        let stream = resp.bytes_stream().eventsource().map(|event| {
            let event = event.context("malformed SSE event")?;
            parse_sse_event(&event.data)
        });

        Ok(stream)
    }
}

/// A single decoded event from the synthesis SSE stream.
#[derive(Debug, Clone)]
pub enum SynthesisEvent {
    TextDelta(String),
    Complete(Usage),
}

fn parse_sse_event(data: &str) -> Result<SynthesisEvent> {
    let value: serde_json::Value = serde_json::from_str(data).context("invalid SSE JSON payload")?;
    match value.get("type").and_then(|t| t.as_str()) {
        Some("content_block_delta") => {
            let text = value
                .pointer("/delta/text")
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string();
            Ok(SynthesisEvent::TextDelta(text))
        }
        Some("message_delta") => {
            let usage = parse_usage(value.get("usage").unwrap_or(&serde_json::Value::Null));
            Ok(SynthesisEvent::Complete(usage))
        }
        _ => Ok(SynthesisEvent::TextDelta(String::new())),
    }
}

fn parse_usage(value: &serde_json::Value) -> Usage {
    Usage {
        input_tokens: value.get("input_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
        cache_creation_tokens: value
            .get("cache_creation_input_tokens")
            .and_then(|v| v.as_i64())
            .unwrap_or(0),
        cache_read_tokens: value
            .get("cache_read_input_tokens")
            .and_then(|v| v.as_i64())
            .unwrap_or(0),
        output_tokens: value.get("output_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
    }
}

fn parse_response(payload: &serde_json::Value) -> Result<LlmResponse> {
    let stop_reason = match payload.get("stop_reason").and_then(|v| v.as_str()) {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    };

    let mut text = String::new();
    let mut tool_uses = Vec::new();
    if let Some(content) = payload.get("content").and_then(|c| c.as_array()) {
        for block in content {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(t) = block.get("text").and_then(|t| t.as_str()) {
                        text.push_str(t);
                    }
                }
                Some("tool_use") => {
                    tool_uses.push(ToolUse {
                        id: block.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                        name: block.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                        input: block.get("input").cloned().unwrap_or(serde_json::Value::Null),
                    });
                }
                _ => {}
            }
        }
    }

    let usage = parse_usage(payload.get("usage").unwrap_or(&serde_json::Value::Null));

    Ok(LlmResponse {
        text,
        tool_uses,
        stop_reason,
        usage,
    })
}
