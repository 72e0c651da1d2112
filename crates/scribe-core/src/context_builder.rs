//! Context Builder (§4.3): assembles the layered, cache-aware prompt --
//! system/global/scene-card blocks (cacheable) plus conversation/local/user
//! blocks (fresh) -- under a token budget. Grounded on the
//! `other_examples/` context-assembler's layer-ordered trim contract,
//! adapted from six generic layers to the six named here.

use crate::db::outline::{CharacterSheet, ScriptOutline};
use crate::db::scripts::Scene;
use crate::llm::{ContentBlock, Role, Turn};
use crate::retrieval::RetrievalResult;
use crate::router::{Classification, Continuity, Domain, Intent, RefersTo, RequestType};
use crate::token::estimate_tokens;

pub struct PromptObject {
    pub system_blocks: Vec<ContentBlock>,
    pub turns: Vec<Turn>,
}

pub struct ContextInputs<'a> {
    pub classification: &'a Classification,
    pub tools_enabled: bool,
    pub tool_names: &'a [String],
    pub outline: Option<&'a ScriptOutline>,
    pub character_sheets: &'a [CharacterSheet],
    pub retrieval_results: &'a [RetrievalResult],
    pub rolling_summary: Option<&'a str>,
    pub recent_messages: &'a [(Role, String)],
    pub current_scene: Option<&'a Scene>,
    pub last_assistant_commitment: Option<&'a str>,
    pub relevant_character_sheet: Option<&'a CharacterSheet>,
    pub user_message: &'a str,
    pub token_budget: usize,
}

const SCENE_POSITION_NOTE: &str = "Scene positions are 0-based internally; the user-facing scene number is position + 1 (e.g., 'Scene 5' = index 4).";

fn system_prompt_block(inputs: &ContextInputs) -> ContentBlock {
    let mut text = String::from(
        "You are a screenwriting assistant with access to a specific script. \
         Answer grounded in the material provided; do not invent scenes, characters, or plot points.\n",
    );

    if inputs.tools_enabled {
        text.push_str(&format!(
            "\n{}\nGive equal weight to every tool result you receive; do not favor the most recently returned result over earlier ones.\nAvailable tools: {}.\n",
            SCENE_POSITION_NOTE,
            inputs.tool_names.join(", ")
        ));
    }

    if inputs.classification.request_type == RequestType::Suggest {
        text.push_str(
            "\nWhen responding, diagnose and suggest edits. Do not produce full rewrites of scene text unless the user explicitly asks for a rewrite.\n",
        );
    }

    ContentBlock::cacheable(text)
}

fn global_context_block(outline: Option<&ScriptOutline>, character_sheets: &[CharacterSheet]) -> Option<ContentBlock> {
    if outline.is_none() && character_sheets.is_empty() {
        return None;
    }
    let mut text = String::from("Script outline and key characters:\n\n");
    if let Some(outline) = outline {
        text.push_str(&format!("Outline: {}\n\n", outline.content));
    }
    for sheet in character_sheets {
        text.push_str(&format!(
            "{}: {}\n",
            sheet.name_normalized,
            sheet.arc.clone().unwrap_or_else(|| "(no arc recorded)".to_string())
        ));
    }
    Some(ContentBlock::cacheable(text))
}

fn scene_cards_block(results: &[RetrievalResult]) -> Option<ContentBlock> {
    if results.is_empty() {
        return None;
    }
    let mut text = String::from("Retrieved scene summaries:\n\n");
    for r in results {
        let summary = r
            .summary
            .as_ref()
            .map(|s| s.summary.as_str())
            .unwrap_or("(no summary available)");
        text.push_str(&format!(
            "Scene {} (index {}): {} — {}\n",
            r.scene.user_number(),
            r.scene.position,
            r.scene.heading,
            summary
        ));
    }
    Some(ContentBlock::cacheable(text))
}

fn conversation_context_block(
    classification: &Classification,
    rolling_summary: Option<&str>,
    recent_messages: &[(Role, String)],
    last_assistant_commitment: Option<&str>,
    relevant_character_sheet: Option<&CharacterSheet>,
) -> Option<ContentBlock> {
    // §4.3 history gating: new_topic omits conversation context entirely,
    // including the rolling summary.
    if classification.continuity == Continuity::NewTopic {
        return None;
    }

    let mut text = String::new();
    if let Some(summary) = rolling_summary {
        text.push_str(&format!("Conversation so far: {}\n\n", summary));
    }
    for (role, content) in recent_messages {
        let label = match role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        text.push_str(&format!("{}: {}\n", label, content));
    }

    if classification.continuity == Continuity::FollowUp && classification.refers_to == RefersTo::PriorAdvice {
        if let Some(commitment) = last_assistant_commitment {
            text.push_str(&format!("\nYour last commitment to the user: \"{}\"\n", commitment));
        }
    }
    if classification.refers_to == RefersTo::Character {
        if let Some(sheet) = relevant_character_sheet {
            text.push_str(&format!(
                "\nRelevant character: {} — {}\n",
                sheet.name_normalized,
                sheet.arc.clone().unwrap_or_default()
            ));
        }
    }

    if text.is_empty() {
        None
    } else {
        Some(ContentBlock::plain(text))
    }
}

fn local_context_block(classification: &Classification, current_scene: Option<&Scene>) -> Option<ContentBlock> {
    if classification.intent != Intent::LocalEdit {
        return None;
    }
    current_scene.map(|scene| {
        ContentBlock::plain(format!(
            "Current scene {} (index {}): {}\n\n{}",
            scene.user_number(),
            scene.position,
            scene.heading,
            scene.content
        ))
    })
}

/// §4.3 budgets: if assembled layers exceed budget, trim scene cards
/// first, then conversation context; never trim system, local, or user.
fn enforce_budget(
    system: Vec<ContentBlock>,
    global: Option<ContentBlock>,
    mut scene_cards: Option<ContentBlock>,
    mut conversation: Option<ContentBlock>,
    local: Option<ContentBlock>,
    user: ContentBlock,
    budget: usize,
) -> (Vec<ContentBlock>, Vec<ContentBlock>) {
    let token_cost = |blocks: &[&Option<ContentBlock>]| -> usize {
        blocks
            .iter()
            .filter_map(|b| b.as_ref())
            .map(|b| estimate_tokens(&b.text))
            .sum()
    };

    let system_tokens: usize = system.iter().map(|b| estimate_tokens(&b.text)).sum();
    let fixed_tokens = system_tokens
        + local.as_ref().map(|b| estimate_tokens(&b.text)).unwrap_or(0)
        + estimate_tokens(&user.text);

    loop {
        let total = fixed_tokens + token_cost(&[&global, &scene_cards, &conversation]);
        if total <= budget {
            break;
        }
        if scene_cards.is_some() {
            scene_cards = None;
            continue;
        }
        if conversation.is_some() {
            conversation = None;
            continue;
        }
        break;
    }

    let mut ordered = Vec::new();
    ordered.extend(system);
    ordered.extend(global);
    ordered.extend(scene_cards);

    let mut turn_blocks = Vec::new();
    turn_blocks.extend(conversation);
    turn_blocks.extend(local);
    turn_blocks.push(user);

    (ordered, turn_blocks)
}

pub fn build(inputs: ContextInputs) -> PromptObject {
    let system = system_prompt_block(&inputs);

    let global = if inputs.classification.domain == Domain::General {
        None
    } else {
        global_context_block(inputs.outline, inputs.character_sheets)
    };

    let scene_cards = if inputs.tools_enabled || inputs.classification.domain == Domain::General {
        None
    } else {
        scene_cards_block(inputs.retrieval_results)
    };

    let conversation = conversation_context_block(
        inputs.classification,
        inputs.rolling_summary,
        inputs.recent_messages,
        inputs.last_assistant_commitment,
        inputs.relevant_character_sheet,
    );

    let local = local_context_block(inputs.classification, inputs.current_scene);
    let user = ContentBlock::plain(inputs.user_message.to_string());

    let (system_blocks, content_blocks) = enforce_budget(
        vec![system],
        global,
        scene_cards,
        conversation,
        local,
        user,
        inputs.token_budget,
    );

    PromptObject {
        system_blocks,
        turns: vec![Turn {
            role: Role::User,
            blocks: content_blocks,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Classification;

    fn base_classification() -> Classification {
        Classification {
            intent: Intent::GlobalQuestion,
            domain: Domain::Script,
            request_type: RequestType::Suggest,
            continuity: Continuity::NewTopic,
            refers_to: RefersTo::None,
            confidence: 0.9,
        }
    }

    #[test]
    fn new_topic_omits_conversation_block() {
        let classification = base_classification();
        let block = conversation_context_block(&classification, Some("prior summary"), &[], None, None);
        assert!(block.is_none());
    }

    #[test]
    fn general_domain_suppresses_scene_cards() {
        let mut classification = base_classification();
        classification.domain = Domain::General;
        let inputs = ContextInputs {
            classification: &classification,
            tools_enabled: false,
            tool_names: &[],
            outline: None,
            character_sheets: &[],
            retrieval_results: &[],
            rolling_summary: None,
            recent_messages: &[],
            current_scene: None,
            last_assistant_commitment: None,
            relevant_character_sheet: None,
            user_message: "What's a save-the-cat beat?",
            token_budget: 5_000,
        };
        let prompt = build(inputs);
        assert_eq!(prompt.system_blocks.len(), 1);
    }

    #[test]
    fn tight_budget_trims_scene_cards_before_system() {
        let classification = base_classification();
        let system = ContentBlock::cacheable("x".repeat(40));
        let scene_cards = Some(ContentBlock::cacheable("y".repeat(4000)));
        let (system_blocks, _) = enforce_budget(
            vec![system],
            None,
            scene_cards,
            None,
            None,
            ContentBlock::plain("hi"),
            20,
        );
        assert_eq!(system_blocks.len(), 1);
    }
}
