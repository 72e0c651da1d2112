//! Conversation Service (§4.4): manages persistent conversation state and
//! orchestrates the whole request (§2: "Conversation Service orchestrates
//! all"). Grounded on the donor's `agent_manager.rs::AgentManager` as the
//! top-level request-scoped orchestrator, and `memory/compaction.rs` for
//! the summary-trigger/working-set-update idioms.

use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use uuid::Uuid;

use crate::config::Config;
use crate::db::conversations::Conversation;
use crate::db::summaries::ConversationSummary;
use crate::db::working_set::WorkingSet;
use crate::llm::predict::summarize_conversation;
use crate::llm::Role;
use crate::token::estimate_tokens;
use crate::Db;

pub struct ConversationService {
    db: Db,
    config: Config,
}

impl ConversationService {
    pub fn new(db: Db, config: Config) -> Arc<Self> {
        Arc::new(Self { db, config })
    }

    pub fn get_or_create(&self, conversation_id: Option<Uuid>, user_id: &str, script_id: Uuid) -> Result<Conversation> {
        self.db.conversations().get_or_create(conversation_id, user_id, script_id)
    }

    pub fn recent_messages(&self, conversation_id: Uuid, limit: i64) -> Result<Vec<(Role, String)>> {
        let messages = self.db.messages().recent_messages(conversation_id, limit)?;
        Ok(messages
            .into_iter()
            .map(|m| {
                let role = if m.role == "assistant" { Role::Assistant } else { Role::User };
                (role, m.content)
            })
            .collect())
    }

    /// `build_history_block(conversation_id, budget) -> text` (§4.4):
    /// rolling summary (if any) + last <=10 messages, truncated oldest-first
    /// under the budget; the summary is never dropped.
    pub fn build_history_block(&self, conversation_id: Uuid, budget: usize) -> Result<String> {
        let summary = self.db.summaries().latest(conversation_id)?;
        let mut messages = self.db.messages().recent_messages(conversation_id, 10)?;

        let summary_text = summary.map(|s| s.content).unwrap_or_default();
        let summary_tokens = estimate_tokens(&summary_text);
        let mut remaining_budget = budget.saturating_sub(summary_tokens);

        let mut kept = Vec::new();
        while let Some(message) = messages.pop() {
            let cost = estimate_tokens(&message.content);
            if cost > remaining_budget && !kept.is_empty() {
                break;
            }
            remaining_budget = remaining_budget.saturating_sub(cost);
            kept.push(message);
        }
        kept.reverse();

        let mut text = String::new();
        if !summary_text.is_empty() {
            text.push_str(&format!("Conversation so far: {}\n\n", summary_text));
        }
        for m in kept {
            text.push_str(&format!("{}: {}\n", m.role, m.content));
        }
        Ok(text)
    }

    /// `maybe_summarize(conversation_id) -> ConversationSummary?` (§4.4):
    /// fires when message count >=15 and the existing summary covers
    /// fewer than count-10 messages. Called from the background worker,
    /// out-of-band, so a failure here never blocks an exchange.
    pub async fn maybe_summarize(&self, conversation_id: Uuid) -> Result<Option<ConversationSummary>> {
        let count = self.db.messages().count(conversation_id)?;
        if count < self.config.summary_message_threshold {
            return Ok(None);
        }

        let existing = self.db.summaries().latest(conversation_id)?;
        if let Some(ref s) = existing {
            if s.covered_through_sequence_id >= count - 10 {
                return Ok(None);
            }
        }

        let messages = self.db.messages().recent_messages(conversation_id, count)?;
        let transcript = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let summary_text = summarize_conversation(&transcript, existing.as_ref().map(|s| s.content.as_str())).await?;
        let covered_through = messages.last().map(|m| m.sequence_id).unwrap_or(count - 1);

        let summary = self.db.summaries().insert(conversation_id, covered_through, &summary_text)?;
        Ok(Some(summary))
    }

    /// Enqueues the out-of-band summary job (§4.4/§9): "use an external
    /// queue with a deduplicating job id rather than in-process background
    /// tasks".
    pub fn enqueue_summary_if_due(&self, conversation_id: Uuid) -> Result<()> {
        let count = self.db.messages().count(conversation_id)?;
        if count < self.config.summary_message_threshold {
            return Ok(());
        }
        let dedup_key = format!("conversation_summary:{}:{}", conversation_id, count);
        self.db.jobs().enqueue(
            crate::db::jobs::JobType::ConversationSummary,
            &dedup_key,
            serde_json::json!({ "conversation_id": conversation_id }),
        )
    }

    /// `update_working_set(conversation_id, assistant_response, tool_uses) -> WorkingSet` (§4.4):
    /// parses the response for scene mentions, character names, and
    /// commitments, then upserts the working set.
    pub fn update_working_set(
        &self,
        conversation_id: Uuid,
        assistant_response: &str,
        script_characters: &[String],
        last_user_intent: Option<&str>,
    ) -> Result<WorkingSet> {
        let mut ws = self.db.working_set().get(conversation_id)?.unwrap_or_default();
        ws.conversation_id = conversation_id;

        ws.active_scene_positions = extract_scene_positions(assistant_response);
        ws.active_characters = script_characters
            .iter()
            .filter(|c| assistant_response.to_uppercase().contains(c.as_str()))
            .cloned()
            .collect();
        if let Some(commitment) = extract_commitment(assistant_response) {
            ws.last_assistant_commitment = Some(commitment);
        }
        if let Some(intent) = last_user_intent {
            ws.last_user_intent = Some(intent.to_string());
        }

        self.db.working_set().upsert(&ws)?;
        Ok(ws)
    }
}

fn extract_scene_positions(text: &str) -> Vec<i32> {
    let re = Regex::new(r"(?i)scene\s+(\d+)").expect("static regex is valid");
    re.captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse::<i32>().ok()))
        .map(|n| n - 1)
        .filter(|p| *p >= 0)
        .collect()
}

const COMMITMENT_TRIGGERS: &[&str] = &["i suggest", "you could try", "i recommend", "consider"];

fn extract_commitment(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    for trigger in COMMITMENT_TRIGGERS {
        if let Some(idx) = lower.find(trigger) {
            let sentence_end = text[idx..].find('.').map(|i| idx + i + 1).unwrap_or(text.len());
            return Some(text[idx..sentence_end].trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_scene_positions_as_zero_based() {
        let positions = extract_scene_positions("I suggest cutting Scene 5's opener, see also Scene 12.");
        assert_eq!(positions, vec![4, 11]);
    }

    #[test]
    fn extracts_first_commitment_sentence() {
        let commitment = extract_commitment("Overall this works. I suggest cutting the opener. Also consider trimming dialogue.");
        assert_eq!(commitment.as_deref(), Some("I suggest cutting the opener."));
    }

    #[test]
    fn no_commitment_returns_none() {
        assert!(extract_commitment("This scene is well balanced.").is_none());
    }
}
