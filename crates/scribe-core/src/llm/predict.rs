//! `dspy_rs`/`baml_bridge` structured single-shot calls: the router's
//! LLM-fallback classification and the conversation summary generation.
//! Grounded on the donor's `sage_agent.rs` (`ToolCall`/`AgentResponse`
//! signatures) and `memory/compaction.rs` (`SummarizeConversation`,
//! retry-with-correction-agent pattern).

use anyhow::Result;
use dspy_rs::{configure, ChatAdapter, Predict, Signature, LM};
use tracing::warn;

/// Configures the global DSRs LM — required once before any `Predict` call,
/// matching the donor's `SageAgent::configure_lm`. `max_tokens` bounds both
/// `Predict` calls that share this global config (router fallback, summary
/// generation); callers pass `Config::summary_max_output_tokens`, the
/// larger of the two call's needs.
pub async fn configure_lm(base_url: &str, api_key: &str, model: &str, max_tokens: u32) -> Result<()> {
    let lm = LM::builder()
        .base_url(base_url.to_string())
        .api_key(api_key.to_string())
        .model(model.to_string())
        .temperature(0.2)
        .max_tokens(max_tokens)
        .build()
        .await?;
    configure(lm, ChatAdapter);
    Ok(())
}

const ROUTER_INSTRUCTION: &str = "\
Classify the user's message about a screenplay. Respond with strict JSON only. \
intent must be one of: local_edit, scene_feedback, global_question, brainstorm, narrative_analysis. \
domain must be one of: script, general, hybrid. \
request_type must be one of: suggest, rewrite, diagnose, brainstorm, factual -- \
only use rewrite if the message explicitly asks to rewrite/revise/draft new lines. \
continuity must be one of: follow_up, new_topic, uncertain. \
refers_to must be one of: scene, character, thread, prior_advice, none. \
confidence is a float in [0,1].";

#[derive(Signature)]
pub struct RouterSignature {
    #[input(desc = "the user's current message")]
    pub message: String,
    #[input(desc = "the assistant's last message, if any")]
    pub last_assistant_message: String,
    #[input(desc = "the user's last message, if any")]
    pub last_user_message: String,

    #[output(desc = "intent: local_edit|scene_feedback|global_question|brainstorm|narrative_analysis")]
    pub intent: String,
    #[output(desc = "domain: script|general|hybrid")]
    pub domain: String,
    #[output(desc = "request_type: suggest|rewrite|diagnose|brainstorm|factual")]
    pub request_type: String,
    #[output(desc = "continuity: follow_up|new_topic|uncertain")]
    pub continuity: String,
    #[output(desc = "refers_to: scene|character|thread|prior_advice|none")]
    pub refers_to: String,
    #[output(desc = "confidence in [0,1]")]
    pub confidence: f32,
}

/// Issues the router's single small LLM call (§4.1 step 4). On any failure
/// (after the predictor's own internal parse/correction), returns `None`
/// so the caller degrades to heuristic defaults -- the router "never
/// propagates" a classification error past this boundary.
pub async fn classify_via_llm(
    message: &str,
    last_assistant_message: Option<&str>,
    last_user_message: Option<&str>,
) -> Option<RouterSignatureOutput> {
    let predictor = Predict::<RouterSignature>::builder()
        .instruction(ROUTER_INSTRUCTION)
        .build();

    let input = RouterSignatureInput {
        message: message.to_string(),
        last_assistant_message: last_assistant_message.unwrap_or_default().to_string(),
        last_user_message: last_user_message.unwrap_or_default().to_string(),
    };

    match predictor.call(input).await {
        Ok(output) => Some(output),
        Err(e) => {
            warn!("router LLM classification failed: {}", e);
            None
        }
    }
}

const SUMMARY_INSTRUCTION: &str = "\
Summarize the older portion of this screenplay conversation in at most 300 tokens of prose. \
Cover: topics discussed, changes/edits made, user preferences expressed, and open questions. \
Be concise and factual; do not invent details not present in the conversation.";

#[derive(Signature)]
pub struct SummarizeConversationSignature {
    #[input(desc = "the messages to summarize, oldest first")]
    pub transcript: String,
    #[input(desc = "the previous rolling summary, if any")]
    pub previous_summary: String,

    #[output(desc = "the updated rolling summary, at most 300 tokens")]
    pub summary: String,
}

/// Generates a rolling summary with one correction retry on malformed
/// output, the donor's `CompactionManager::generate_summary` idiom.
pub async fn summarize_conversation(transcript: &str, previous_summary: Option<&str>) -> Result<String> {
    let predictor = Predict::<SummarizeConversationSignature>::builder()
        .instruction(SUMMARY_INSTRUCTION)
        .build();

    let input = SummarizeConversationSignatureInput {
        transcript: transcript.to_string(),
        previous_summary: previous_summary.unwrap_or_default().to_string(),
    };

    let output = predictor.call(input).await?;
    Ok(output.summary)
}
