//! Top-level request orchestration (§2: "Conversation Service orchestrates
//! all"; §6 Inputs/Outputs). Wires Router -> Context Builder -> Agent Loop
//! -> Persistence for a single request. Grounded on the donor's
//! `main.rs::process_message` top-level driver, which performed the same
//! "classify, assemble, call, persist" sequence for a single inbound
//! message.

use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

use crate::agent_loop::{self, AgentLoopConfig, LoopStopReason, StreamEvent};
use crate::config::Config;
use crate::context_builder::{self, ContextInputs};
use crate::conversation_service::ConversationService;
use crate::embedding_client::EmbeddingClient;
use crate::error::CoreError;
use crate::llm::client::LlmClient;
use crate::retrieval::RetrievalService;
use crate::router::{self, ClassifyInput, ContinuityOverride};
use crate::tools::ToolExecutor;
use crate::Db;

pub struct ExchangeRequest {
    pub script_id: Uuid,
    pub user_id: String,
    pub conversation_id: Option<Uuid>,
    pub current_scene_position: Option<i32>,
    pub message: String,
    /// §6 `intent_hint?`: an optional user-supplied hint for the router's
    /// intent axis, e.g. "local_edit". Unrecognized values are ignored.
    pub intent_hint: Option<String>,
    pub budget_tier: Option<String>,
    pub max_iterations: Option<u32>,
    pub enable_tools: Option<bool>,
    pub topic_mode_override: Option<ContinuityOverride>,
}

pub struct ExchangeServices<'a> {
    pub db: &'a Db,
    pub config: &'a Config,
    pub llm: &'a LlmClient,
    pub embeddings: &'a EmbeddingClient,
    pub conversation_service: &'a Arc<ConversationService>,
}

/// Validation failures (§7 "bad input ... refuse with a structured error;
/// no LLM call made").
fn validate(req: &ExchangeRequest) -> Result<(), CoreError> {
    if req.message.trim().is_empty() {
        return Err(CoreError::Validation("message must not be empty".to_string()));
    }
    Ok(())
}

pub async fn handle(
    req: ExchangeRequest,
    services: ExchangeServices<'_>,
    events: &Sender<StreamEvent>,
) -> Result<(), CoreError> {
    validate(&req)?;

    let conversation = services
        .conversation_service
        .get_or_create(req.conversation_id, &req.user_id, req.script_id)
        .map_err(|e| CoreError::Persistence(e.to_string()))?;

    let has_active_conversation = services
        .db
        .messages()
        .count(conversation.id)
        .map_err(|e| CoreError::Persistence(e.to_string()))?
        > 0;
    let recent = services
        .conversation_service
        .recent_messages(conversation.id, 1)
        .map_err(|e| CoreError::Persistence(e.to_string()))?;
    let last_assistant_message = recent
        .iter()
        .rev()
        .find(|(role, _)| *role == crate::llm::Role::Assistant)
        .map(|(_, text)| text.as_str());
    let last_user_message = recent
        .iter()
        .rev()
        .find(|(role, _)| *role == crate::llm::Role::User)
        .map(|(_, text)| text.as_str());

    let classification = router::classify(ClassifyInput {
        message: &req.message,
        last_assistant_message,
        last_user_message,
        has_active_conversation,
        continuity_override: req.topic_mode_override,
        intent_hint: req.intent_hint.as_deref().and_then(router::parse_intent),
        confidence_threshold: services.config.router_confidence_threshold,
    })
    .await;

    let current_scene = match req.current_scene_position {
        Some(p) => services
            .db
            .scripts()
            .get_scene_by_position(req.script_id, p)
            .map_err(|e| CoreError::Persistence(e.to_string()))?,
        None => None,
    };

    let retrieval = RetrievalService::new(services.db, services.embeddings);
    let retrieval_results = retrieval
        .retrieve_for_intent(req.script_id, &req.message, classification.intent, req.current_scene_position)
        .await
        .unwrap_or_default();

    let tools_on = agent_loop::tools_enabled(
        &classification,
        &req.message,
        current_scene.is_some(),
        req.enable_tools,
    );

    let tool_executor = ToolExecutor::new(req.script_id, services.db, &retrieval, services.config.tool_caps);
    let tool_definitions = tool_executor.definitions();
    let tool_names: Vec<String> = tool_definitions.iter().map(|t| t.name.clone()).collect();

    let outline = services
        .db
        .outline()
        .get_outline(req.script_id)
        .map_err(|e| CoreError::Persistence(e.to_string()))?;
    let character_sheets = services
        .db
        .outline()
        .top_character_sheets(req.script_id, 10)
        .map_err(|e| CoreError::Persistence(e.to_string()))?;
    let rolling_summary = services
        .db
        .summaries()
        .latest(conversation.id)
        .map_err(|e| CoreError::Persistence(e.to_string()))?
        .map(|s| s.content);
    let recent_messages = services
        .conversation_service
        .recent_messages(conversation.id, 10)
        .map_err(|e| CoreError::Persistence(e.to_string()))?;
    let working_set = services
        .db
        .working_set()
        .get(conversation.id)
        .map_err(|e| CoreError::Persistence(e.to_string()))?;
    let relevant_character_sheet = working_set.as_ref().and_then(|ws| {
        ws.active_characters
            .first()
            .and_then(|name| services.db.outline().get_character_sheet(req.script_id, name).ok().flatten())
    });

    // Never assemble a prompt the model's own context window couldn't hold,
    // regardless of which budget tier the request asked for.
    let budget = services
        .config
        .budgets
        .resolve(req.budget_tier.as_deref())
        .min(services.config.llm_context_window);
    let prompt = context_builder::build(ContextInputs {
        classification: &classification,
        tools_enabled: tools_on,
        tool_names: &tool_names,
        outline: outline.as_ref(),
        character_sheets: &character_sheets,
        retrieval_results: &retrieval_results,
        rolling_summary: rolling_summary.as_deref(),
        recent_messages: &recent_messages,
        current_scene: current_scene.as_ref(),
        last_assistant_commitment: working_set.as_ref().and_then(|ws| ws.last_assistant_commitment.as_deref()),
        relevant_character_sheet: relevant_character_sheet.as_ref(),
        user_message: &req.message,
        token_budget: budget,
    });

    let max_iterations = req.max_iterations.unwrap_or(services.config.default_max_iterations);
    let format_instructions = agent_loop::format_instructions_for_intent(classification.intent);

    agent_loop::run(
        services.llm,
        &tool_executor,
        prompt.system_blocks,
        prompt.turns,
        tool_definitions,
        tools_on,
        &req.message,
        format_instructions,
        conversation.id,
        &AgentLoopConfig {
            max_iterations,
            max_recovery_attempts: services.config.max_truncation_recoveries,
        },
        events,
    )
    .await
    .map_err(|e| {
        let retryable = e
            .downcast_ref::<crate::llm::client::ProviderError>()
            .map(|pe| pe.retryable)
            .unwrap_or(false);
        CoreError::Provider { retryable, message: e.to_string() }
    })?;

    Ok(())
}

/// Persists the exchange once the caller has collected the full synthesized
/// text from the `Text` events (§5 "either both messages are written or
/// neither"). Called by the transport layer after stream completion.
pub fn persist_exchange(
    db: &Db,
    config: &Config,
    conversation_service: &ConversationService,
    conversation_id: Uuid,
    user_message: &str,
    assistant_text: &str,
    script_characters: &[String],
    usage: crate::llm::Usage,
    stop_reason: LoopStopReason,
) -> Result<(), CoreError> {
    let _ = stop_reason;
    db.messages()
        .insert_exchange(conversation_id, user_message, assistant_text)
        .map_err(|e| CoreError::Persistence(e.to_string()))?;

    let cost = usage.cost_minor_units(config.pricing.price_in, config.pricing.price_out);
    db.usage()
        .append(
            conversation_id,
            usage.input_tokens,
            usage.cache_creation_tokens,
            usage.cache_read_tokens,
            usage.output_tokens,
            cost,
        )
        .map_err(|e| CoreError::Persistence(e.to_string()))?;

    conversation_service
        .update_working_set(conversation_id, assistant_text, script_characters, None)
        .map_err(|e| CoreError::Persistence(e.to_string()))?;
    conversation_service
        .enqueue_summary_if_due(conversation_id)
        .map_err(|e| CoreError::Persistence(e.to_string()))?;

    Ok(())
}
