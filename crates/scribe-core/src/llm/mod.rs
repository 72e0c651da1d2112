//! LLM collaborator types shared between the `dspy_rs`-based structured
//! calls (router fallback, summary generation) and the direct streaming
//! client used by the agent loop (see SPEC_FULL.md §9 for why both exist).

pub mod client;
pub mod predict;

use serde::{Deserialize, Serialize};

/// Token usage for a single LLM call (§3 TokenUsageRow, §6 pricing model).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: i64,
    pub cache_creation_tokens: i64,
    pub cache_read_tokens: i64,
    pub output_tokens: i64,
}

impl Usage {
    pub fn accumulate(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.output_tokens += other.output_tokens;
    }

    /// §6 pricing model: cost = input*p_in + cache_creation*1.25*p_in +
    /// cache_read*0.1*p_in + output*p_out.
    pub fn cost_minor_units(&self, price_in: f64, price_out: f64) -> i64 {
        let cost = self.input_tokens as f64 * price_in
            + self.cache_creation_tokens as f64 * 1.25 * price_in
            + self.cache_read_tokens as f64 * 0.1 * price_in
            + self.output_tokens as f64 * price_out;
        cost.round() as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single content block within a message turn. Cacheable blocks carry a
/// `cache_control` marker the provider uses for prompt caching (§4.3); the
/// core only emits the marker and never inspects cache behavior itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    pub text: String,
    pub cacheable: bool,
}

impl ContentBlock {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cacheable: false,
        }
    }

    pub fn cacheable(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cacheable: true,
        }
    }
}

/// One turn in the conversation sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
}

/// A tool invocation requested by the model mid-loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Why the provider stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

/// Tool schema exposed to the provider (§6): name, description, JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Result of one non-streaming request/response round in the agent loop.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub tool_uses: Vec<ToolUse>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}
