//! Environment-driven configuration for the conversation core.

use anyhow::{Context, Result};

/// Token budget tiers selectable per request (`budget_tier` on the inbound request).
#[derive(Debug, Clone, Copy)]
pub struct BudgetTiers {
    pub quick: usize,
    pub standard: usize,
    pub deep: usize,
}

impl BudgetTiers {
    pub fn resolve(&self, tier: Option<&str>) -> usize {
        match tier {
            Some("quick") => self.quick,
            Some("deep") => self.deep,
            _ => self.standard,
        }
    }
}

/// Per-tool output character caps (§4.5 output-format policy).
#[derive(Debug, Clone, Copy)]
pub struct ToolCaps {
    pub get_scene_chars: usize,
    pub context_batch_chars: usize,
}

/// Pricing rates for token-usage cost computation (§6).
#[derive(Debug, Clone, Copy)]
pub struct PricingConfig {
    /// Price per input token, in minor currency units per token.
    pub price_in: f64,
    /// Price per output token, in minor currency units per token.
    pub price_out: f64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,

    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_context_window: usize,

    pub embedding_api_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dim: usize,

    pub budgets: BudgetTiers,
    pub tool_caps: ToolCaps,
    pub pricing: PricingConfig,

    pub default_max_iterations: u32,
    pub max_truncation_recoveries: u32,
    pub max_provider_retries: u32,

    pub router_confidence_threshold: f32,
    pub summary_message_threshold: i64,
    pub summary_max_output_tokens: u32,

    pub job_queue_poll_interval_secs: u64,

    pub http_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,

            llm_api_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080/v1".to_string()),
            llm_api_key: std::env::var("LLM_API_KEY").ok(),
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "claude-sonnet-4".to_string()),
            llm_context_window: std::env::var("LLM_CONTEXT_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(200_000),

            embedding_api_url: std::env::var("EMBEDDING_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080/v1".to_string()),
            embedding_api_key: std::env::var("EMBEDDING_API_KEY").ok(),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            embedding_dim: std::env::var("EMBEDDING_DIM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1536),

            budgets: BudgetTiers {
                quick: std::env::var("BUDGET_QUICK")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1_200),
                standard: std::env::var("BUDGET_STANDARD")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5_000),
                deep: std::env::var("BUDGET_DEEP")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20_000),
            },

            tool_caps: ToolCaps {
                get_scene_chars: std::env::var("TOOL_GET_SCENE_CHARS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3_000),
                context_batch_chars: std::env::var("TOOL_CONTEXT_BATCH_CHARS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2_000),
            },

            pricing: PricingConfig {
                price_in: std::env::var("PRICE_IN_PER_TOKEN")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.003),
                price_out: std::env::var("PRICE_OUT_PER_TOKEN")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.015),
            },

            default_max_iterations: std::env::var("MAX_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            max_truncation_recoveries: 2,
            max_provider_retries: 2,

            router_confidence_threshold: std::env::var("ROUTER_CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.6),
            summary_message_threshold: 15,
            summary_max_output_tokens: 300,

            job_queue_poll_interval_secs: std::env::var("JOB_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            http_port: std::env::var("HTTP_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("HTTP_PORT must be a valid port number")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_tiers_resolve_by_name() {
        let tiers = BudgetTiers {
            quick: 1_200,
            standard: 5_000,
            deep: 20_000,
        };
        assert_eq!(tiers.resolve(Some("quick")), 1_200);
        assert_eq!(tiers.resolve(Some("deep")), 20_000);
        assert_eq!(tiers.resolve(Some("bogus")), 5_000);
        assert_eq!(tiers.resolve(None), 5_000);
    }
}
