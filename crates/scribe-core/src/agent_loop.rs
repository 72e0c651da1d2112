//! Agent Loop (§4.6): orchestrates the multi-turn LLM interaction when
//! tools are enabled, streams text to the caller, and produces the final
//! synthesized response. Grounded on the donor's `sage_agent.rs::step`/
//! `process_message` driving loop -- same request/tool-dispatch/recovery
//! shape, generalized from the donor's single messaging tool set to the
//! nine screenplay tools and the evidence-synthesis phase this domain adds.

use tokio::sync::mpsc::Sender;
use uuid::Uuid;

use crate::evidence::{build_evidence, RawToolResult};
use crate::llm::client::{LlmClient, SynthesisEvent};
use crate::llm::{ContentBlock, LlmResponse, Role, StopReason, ToolDefinition, Turn, Usage};
use crate::router::{Classification, Domain, Intent};
use crate::tools::{ToolExecutor, DONE_TOOL_NAME};

const DEFAULT_MAX_ITERATIONS: u32 = 5;
const DEFAULT_MAX_RECOVERY_ATTEMPTS: u32 = 2;
const SYNTHESIS_MAX_TOKENS: u32 = 1_200;

const ANALYTICAL_KEYWORDS: &[&str] = &["analyze", "track", "find all", "search"];

/// §4.6 "Decision to enable tools". `user_override` wins over every
/// heuristic below it.
pub fn tools_enabled(classification: &Classification, message: &str, current_scene_provided: bool, user_override: Option<bool>) -> bool {
    if let Some(v) = user_override {
        return v;
    }
    if classification.domain == Domain::General {
        return false;
    }
    if matches!(classification.intent, Intent::NarrativeAnalysis | Intent::GlobalQuestion) {
        return true;
    }
    if matches!(classification.intent, Intent::LocalEdit | Intent::SceneFeedback) && current_scene_provided {
        return false;
    }
    let lower = message.to_lowercase();
    if ANALYTICAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return true;
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStopReason {
    EndTurn,
    MaxIterations,
    TruncationExhausted,
}

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Thinking(String),
    Status { tool_name: String, message: String },
    Text(String),
    Complete {
        usage: Usage,
        tool_calls_made: u32,
        tools_used: Vec<String>,
        stop_reason: LoopStopReason,
        recovery_attempts: u32,
    },
    StreamEnd { conversation_id: Uuid },
}

pub struct AgentLoopConfig {
    pub max_iterations: u32,
    pub max_recovery_attempts: u32,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
        }
    }
}

fn status_template(tool_name: &str, input: &serde_json::Value) -> String {
    match tool_name {
        "get_scene" => format!(
            "Reading scene {}…",
            input.get("scene_index").and_then(|v| v.as_i64()).map(|v| v + 1).unwrap_or(0)
        ),
        "get_scenes" => {
            let nums: Vec<String> = input
                .get("scene_indices")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|v| v.as_i64()).map(|v| (v + 1).to_string()).collect())
                .unwrap_or_default();
            format!("Reading scenes {}…", nums.join(", "))
        }
        "search_script" => "Searching the script…".to_string(),
        "analyze_pacing" => "Analyzing pacing…".to_string(),
        "get_plot_threads" => "Looking up plot threads…".to_string(),
        "get_scene_relationships" => "Looking up scene relationships…".to_string(),
        "get_character_scenes" => "Finding character scenes…".to_string(),
        _ => format!("Running {}…", tool_name),
    }
}

/// Runs the full loop contract (§4.6) and the synthesis phase, emitting
/// `StreamEvent`s to `events` as they occur. Returns the loop's final
/// evidence-backed text isn't returned separately -- the caller reads it
/// off the `Text` events and the trailing `Complete`/`StreamEnd` pair.
pub async fn run(
    llm: &LlmClient,
    executor: &ToolExecutor<'_>,
    system_blocks: Vec<ContentBlock>,
    mut messages: Vec<Turn>,
    tool_definitions: Vec<ToolDefinition>,
    tools_on: bool,
    user_question: &str,
    format_instructions: &str,
    conversation_id: Uuid,
    config: &AgentLoopConfig,
    events: &Sender<StreamEvent>,
) -> anyhow::Result<()> {
    let mut total_usage = Usage::default();
    let mut recovery_attempts = 0u32;
    let mut tool_calls_made = 0u32;
    let mut tools_used: Vec<String> = Vec::new();
    let mut raw_results: Vec<RawToolResult> = Vec::new();
    let mut stop_reason = LoopStopReason::EndTurn;
    let mut final_text: Option<String> = None;

    let effective_tools: Vec<ToolDefinition> = if tools_on { tool_definitions } else { Vec::new() };

    if tools_on {
        let _ = events.send(StreamEvent::Thinking("Planning which scenes to examine…".to_string())).await;
    }

    for iteration in 0..config.max_iterations {
        let response: LlmResponse = llm.request(&system_blocks, &messages, &effective_tools, 4_096).await?;
        total_usage.accumulate(&response.usage);

        if response.stop_reason == StopReason::MaxTokens && recovery_attempts < config.max_recovery_attempts {
            recovery_attempts += 1;
            messages.push(Turn {
                role: Role::Assistant,
                blocks: vec![ContentBlock::plain(response.text.clone())],
            });
            messages.push(Turn {
                role: Role::User,
                blocks: vec![ContentBlock::plain("Continue your tool planning. Output ONLY tool calls.")],
            });
            continue;
        }

        if response.stop_reason != StopReason::ToolUse {
            final_text = Some(response.text.clone());
            break;
        }

        // §4.6 reversed tool-result ordering: the oldest (and often most
        // topically correct) result lands last in the context window.
        let mut iteration_results = Vec::new();
        let mut done_signaled = false;
        for tool_use in &response.tool_uses {
            if tool_use.name == DONE_TOOL_NAME {
                // Exit path 2: a "synthesis signal" call is not dispatched
                // to the executor, it just ends tool use for this request.
                done_signaled = true;
                continue;
            }

            let _ = events
                .send(StreamEvent::Status {
                    tool_name: tool_use.name.clone(),
                    message: status_template(&tool_use.name, &tool_use.input),
                })
                .await;

            let result_text = executor.execute(&tool_use.name, tool_use.input.clone()).await;
            tool_calls_made += 1;
            if !tools_used.contains(&tool_use.name) {
                tools_used.push(tool_use.name.clone());
            }
            raw_results.push(RawToolResult {
                tool_name: tool_use.name.clone(),
                tool_input: tool_use.input.clone(),
                result_text: result_text.clone(),
            });
            iteration_results.push((tool_use.name.clone(), result_text));
        }
        iteration_results.reverse();

        messages.push(Turn {
            role: Role::Assistant,
            blocks: vec![ContentBlock::plain(response.text.clone())],
        });
        if !iteration_results.is_empty() {
            let tool_result_text = iteration_results
                .iter()
                .map(|(name, result)| format!("Tool {} result:\n{}", name, result))
                .collect::<Vec<_>>()
                .join("\n\n");
            messages.push(Turn {
                role: Role::User,
                blocks: vec![ContentBlock::plain(tool_result_text)],
            });
        }

        if done_signaled {
            break;
        }

        if iteration + 1 == config.max_iterations {
            stop_reason = LoopStopReason::MaxIterations;
        }
    }

    if final_text.is_none()
        && stop_reason != LoopStopReason::MaxIterations
        && recovery_attempts >= config.max_recovery_attempts
    {
        stop_reason = LoopStopReason::TruncationExhausted;
    }

    // Synthesis phase: runs when any tool results were collected, or when
    // max_iterations forced an exit without a natural end_turn.
    if !raw_results.is_empty() || final_text.is_none() {
        let evidence = build_evidence(user_question, &raw_results);
        let evidence_block = evidence.format(user_question);
        let synthesis_prompt = format!(
            "Answer this question: {}\n\nUsing this evidence:\n{}\n\n{}\n\nCRITICAL: start directly with the answer, cite scene numbers, do not mention the tools.",
            user_question, evidence_block, format_instructions
        );
        let system_prompt = system_blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n");

        let mut stream = llm.stream_synthesis(&system_prompt, &synthesis_prompt, SYNTHESIS_MAX_TOKENS).await?;
        use futures::StreamExt;
        while let Some(event) = stream.next().await {
            match event? {
                SynthesisEvent::TextDelta(delta) => {
                    if !delta.is_empty() {
                        let _ = events.send(StreamEvent::Text(delta)).await;
                    }
                }
                SynthesisEvent::Complete(usage) => {
                    total_usage.accumulate(&usage);
                }
            }
        }
    } else if let Some(text) = final_text {
        let _ = events.send(StreamEvent::Text(text)).await;
    }

    let _ = events
        .send(StreamEvent::Complete {
            usage: total_usage,
            tool_calls_made,
            tools_used,
            stop_reason,
            recovery_attempts,
        })
        .await;
    let _ = events.send(StreamEvent::StreamEnd { conversation_id }).await;

    Ok(())
}

/// §4.3 "Format instructions by intent", appended to the synthesis prompt
/// rather than the initial system prompt.
pub fn format_instructions_for_intent(intent: Intent) -> &'static str {
    match intent {
        Intent::LocalEdit => "Give one revised version if requested, with at most 3 sentences of rationale.",
        Intent::SceneFeedback => "Structure as strength / improvement / specific suggestion, at most 150 words.",
        Intent::GlobalQuestion => "At most 5 bullets, each referencing a scene number, at most 200 words total.",
        Intent::Brainstorm => "Offer 3 to 5 options, 1 to 2 sentences each, at most 200 words total.",
        Intent::NarrativeAnalysis => "Structure as finding / evidence with scene numbers / implication, at most 200 words.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Continuity, RefersTo, RequestType};

    fn classification(intent: Intent, domain: Domain) -> Classification {
        Classification {
            intent,
            domain,
            request_type: RequestType::Suggest,
            continuity: Continuity::NewTopic,
            refers_to: RefersTo::None,
            confidence: 0.9,
        }
    }

    #[test]
    fn general_domain_disables_tools_even_with_override_absent() {
        let c = classification(Intent::GlobalQuestion, Domain::General);
        assert!(!tools_enabled(&c, "anything", false, None));
    }

    #[test]
    fn local_edit_with_current_scene_disables_tools() {
        let c = classification(Intent::LocalEdit, Domain::Script);
        assert!(!tools_enabled(&c, "fix this line", true, None));
    }

    #[test]
    fn user_override_wins_over_everything() {
        let c = classification(Intent::LocalEdit, Domain::General);
        assert!(tools_enabled(&c, "anything", true, Some(true)));
    }

    #[test]
    fn narrative_analysis_enables_tools() {
        let c = classification(Intent::NarrativeAnalysis, Domain::Script);
        assert!(tools_enabled(&c, "what's the theme here", false, None));
    }
}
