//! Router (Classifier), §4.1: maps a user message to
//! `(intent, domain, request_type, continuity, refers_to, confidence)` in
//! one call, heuristics first, LLM fallback only when confidence is low.
//! Grounded on the donor's `sage_agent.rs` dispatch-by-keyword pass (the
//! same "cheap pass before touching the model" shape), generalized from
//! a fixed two-way dispatch to the five-dimension tuple here.

use crate::llm::predict::classify_via_llm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    LocalEdit,
    SceneFeedback,
    GlobalQuestion,
    Brainstorm,
    NarrativeAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Script,
    General,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Suggest,
    Rewrite,
    Diagnose,
    Brainstorm,
    Factual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    FollowUp,
    NewTopic,
    Uncertain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefersTo {
    Scene,
    Character,
    Thread,
    PriorAdvice,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuityOverride {
    Continue,
    NewTopic,
}

#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub intent: Intent,
    pub domain: Domain,
    pub request_type: RequestType,
    pub continuity: Continuity,
    pub refers_to: RefersTo,
    pub confidence: f32,
}

impl Classification {
    /// The router's contract: "never propagates [a classification error];
    /// degrades to (global_question, script, suggest, follow_up, none, 0.3)".
    pub fn degraded_default() -> Self {
        Self {
            intent: Intent::GlobalQuestion,
            domain: Domain::Script,
            request_type: RequestType::Suggest,
            continuity: Continuity::FollowUp,
            refers_to: RefersTo::None,
            confidence: 0.3,
        }
    }
}

const REWRITE_TRIGGERS: &[&str] = &["rewrite", "revise", "draft", "give me new lines", "new draft"];
const LOCAL_EDIT_MARKERS: &[&str] = &["this scene", "this line", "this dialogue", "fix this", "punch up"];
const BRAINSTORM_MARKERS: &[&str] = &["brainstorm", "what if", "ideas for", "pitch me", "spitball"];
const NARRATIVE_MARKERS: &[&str] = &["theme", "arc", "structure", "act break", "throughline", "subtext"];
const FOLLOW_UP_MARKERS: &[&str] = &["also", "what about", "you mentioned", "going back to", "and also"];
const DISAGREEMENT_MARKERS: &[&str] = &["i don't know", "i disagree", "but i", "why doesn't"];
const REFERENTIAL_PRONOUNS: &[&str] = &["this ", "that ", "these ", "those "];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Heuristic pass over the message (zero tokens). Returns a classification
/// and its confidence per dimension folded into a single overall score --
/// the lowest per-dimension confidence gates whether the LLM fallback
/// fires (§4.1 step 4).
fn heuristic_pass(
    message: &str,
    has_active_conversation: bool,
    last_assistant_had_scene_number: bool,
    message_has_scene_number: bool,
) -> (Classification, f32) {
    let lower = message.to_lowercase();
    let word_count = message.split_whitespace().count();

    let intent = if contains_any(&lower, LOCAL_EDIT_MARKERS) {
        Intent::LocalEdit
    } else if contains_any(&lower, BRAINSTORM_MARKERS) {
        Intent::Brainstorm
    } else if contains_any(&lower, NARRATIVE_MARKERS) {
        Intent::NarrativeAnalysis
    } else if lower.contains("feedback") || lower.contains("what do you think") {
        Intent::SceneFeedback
    } else {
        Intent::GlobalQuestion
    };
    let intent_confidence = if intent == Intent::GlobalQuestion { 0.5 } else { 0.75 };

    let domain = Domain::Script;

    let request_type = if contains_any(&lower, REWRITE_TRIGGERS) {
        RequestType::Rewrite
    } else if intent == Intent::NarrativeAnalysis {
        RequestType::Diagnose
    } else if intent == Intent::Brainstorm {
        RequestType::Brainstorm
    } else if intent == Intent::GlobalQuestion && domain != Domain::Script {
        RequestType::Factual
    } else {
        RequestType::Suggest
    };

    // §4.1 step 3: default continuity within an active conversation is
    // `follow_up` with confidence 0.5 -- losing context is worse than
    // redundant context. Short messages are a strong follow-up signal.
    let (continuity, continuity_confidence) = if !has_active_conversation {
        (Continuity::NewTopic, 0.7)
    } else if contains_any(&lower, FOLLOW_UP_MARKERS)
        || contains_any(&lower, DISAGREEMENT_MARKERS)
        || (last_assistant_had_scene_number && message_has_scene_number)
    {
        (Continuity::FollowUp, 0.8)
    } else if word_count < 8 {
        (Continuity::FollowUp, 0.7)
    } else {
        (Continuity::FollowUp, 0.5)
    };

    let refers_to = if message_has_scene_number {
        RefersTo::Scene
    } else if contains_any(&lower, REFERENTIAL_PRONOUNS) {
        RefersTo::PriorAdvice
    } else {
        RefersTo::None
    };
    let refers_to_confidence = if refers_to == RefersTo::None { 0.5 } else { 0.7 };

    let overall_confidence = intent_confidence
        .min(continuity_confidence)
        .min(refers_to_confidence);

    (
        Classification {
            intent,
            domain,
            request_type,
            continuity,
            refers_to,
            confidence: overall_confidence,
        },
        overall_confidence,
    )
}

pub fn parse_intent(s: &str) -> Option<Intent> {
    match s {
        "local_edit" => Some(Intent::LocalEdit),
        "scene_feedback" => Some(Intent::SceneFeedback),
        "global_question" => Some(Intent::GlobalQuestion),
        "brainstorm" => Some(Intent::Brainstorm),
        "narrative_analysis" => Some(Intent::NarrativeAnalysis),
        _ => None,
    }
}

fn parse_domain(s: &str) -> Option<Domain> {
    match s {
        "script" => Some(Domain::Script),
        "general" => Some(Domain::General),
        "hybrid" => Some(Domain::Hybrid),
        _ => None,
    }
}

fn parse_request_type(s: &str) -> Option<RequestType> {
    match s {
        "suggest" => Some(RequestType::Suggest),
        "rewrite" => Some(RequestType::Rewrite),
        "diagnose" => Some(RequestType::Diagnose),
        "brainstorm" => Some(RequestType::Brainstorm),
        "factual" => Some(RequestType::Factual),
        _ => None,
    }
}

fn parse_continuity(s: &str) -> Option<Continuity> {
    match s {
        "follow_up" => Some(Continuity::FollowUp),
        "new_topic" => Some(Continuity::NewTopic),
        "uncertain" => Some(Continuity::Uncertain),
        _ => None,
    }
}

fn parse_refers_to(s: &str) -> Option<RefersTo> {
    match s {
        "scene" => Some(RefersTo::Scene),
        "character" => Some(RefersTo::Character),
        "thread" => Some(RefersTo::Thread),
        "prior_advice" => Some(RefersTo::PriorAdvice),
        "none" => Some(RefersTo::None),
        _ => None,
    }
}

pub struct ClassifyInput<'a> {
    pub message: &'a str,
    pub last_assistant_message: Option<&'a str>,
    pub last_user_message: Option<&'a str>,
    pub has_active_conversation: bool,
    pub continuity_override: Option<ContinuityOverride>,
    /// §4.1 contract input: "optional user-supplied hint for intent".
    /// Overrides whatever the heuristic pass or LLM fallback produced.
    pub intent_hint: Option<Intent>,
    pub confidence_threshold: f32,
}

/// §4.1: single entry point for the router. Never returns an error --
/// on any internal failure it returns the degraded default instead.
pub async fn classify(input: ClassifyInput<'_>) -> Classification {
    let message_has_scene_number = input.message.chars().any(|c| c.is_ascii_digit())
        && (input.message.to_lowercase().contains("scene") || input.message.contains('#'));
    let last_assistant_had_scene_number = input
        .last_assistant_message
        .map(|m| m.to_lowercase().contains("scene") && m.chars().any(|c| c.is_ascii_digit()))
        .unwrap_or(false);

    let (mut classification, confidence) = heuristic_pass(
        input.message,
        input.has_active_conversation,
        last_assistant_had_scene_number,
        message_has_scene_number,
    );

    if let Some(over) = input.continuity_override {
        classification.continuity = match over {
            ContinuityOverride::Continue => Continuity::FollowUp,
            ContinuityOverride::NewTopic => Continuity::NewTopic,
        };
    }

    let mut result = if confidence >= input.confidence_threshold {
        classification
    } else {
        match classify_via_llm(
            input.message,
            input.last_assistant_message,
            input.last_user_message,
        )
        .await
        {
            Some(out) => {
                let intent = parse_intent(&out.intent);
                let domain = parse_domain(&out.domain);
                let request_type = parse_request_type(&out.request_type);
                let continuity = parse_continuity(&out.continuity);
                let refers_to = parse_refers_to(&out.refers_to);

                match (intent, domain, request_type, continuity, refers_to) {
                    (Some(intent), Some(domain), Some(request_type), Some(continuity), Some(refers_to)) => {
                        let continuity = match input.continuity_override {
                            Some(ContinuityOverride::Continue) => Continuity::FollowUp,
                            Some(ContinuityOverride::NewTopic) => Continuity::NewTopic,
                            None => continuity,
                        };
                        Classification {
                            intent,
                            domain,
                            request_type,
                            continuity,
                            refers_to,
                            confidence: out.confidence.clamp(0.0, 1.0),
                        }
                    }
                    _ => classification,
                }
            }
            None => classification,
        }
    };

    if let Some(hint) = input.intent_hint {
        result.intent = hint;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_requires_explicit_trigger() {
        let (c, _) = heuristic_pass("can you punch up this scene", true, false, false);
        assert_eq!(c.request_type, RequestType::Suggest);
        let (c, _) = heuristic_pass("please rewrite this scene", true, false, false);
        assert_eq!(c.request_type, RequestType::Rewrite);
    }

    #[test]
    fn short_active_message_is_follow_up() {
        let (c, _) = heuristic_pass("what about her?", true, false, false);
        assert_eq!(c.continuity, Continuity::FollowUp);
    }

    #[test]
    fn no_active_conversation_is_new_topic() {
        let (c, _) = heuristic_pass("Tell me about the three-act structure.", false, false, false);
        assert_eq!(c.continuity, Continuity::NewTopic);
    }

    #[test]
    fn degraded_default_matches_contract() {
        let d = Classification::degraded_default();
        assert_eq!(d.intent, Intent::GlobalQuestion);
        assert_eq!(d.domain, Domain::Script);
        assert_eq!(d.request_type, RequestType::Suggest);
        assert_eq!(d.continuity, Continuity::FollowUp);
        assert_eq!(d.refers_to, RefersTo::None);
        assert!((d.confidence - 0.3).abs() < f32::EPSILON);
    }
}
