//! Evidence Builder (§4.7): converts raw tool-result accumulation into a
//! ranked, truncated evidence block for synthesis. Grounded on the
//! `other_examples/` context-assembler's budget/truncation bookkeeping
//! (`AssemblyMetadata`/`DropInfo`-style accounting), generalized here from
//! layer budgets to a flat item list scored by question relevance.

const ITEM_CONTENT_CAP: usize = 1_500;
const TOTAL_CHAR_BUDGET: usize = 8_000;
const MAX_ITEMS: usize = 10;

#[derive(Debug, Clone)]
pub struct RawToolResult {
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub result_text: String,
}

#[derive(Debug, Clone)]
pub struct EvidenceItem {
    pub source_tool: String,
    pub scene_positions: Vec<i32>,
    pub content: String,
    pub relevance_score: f32,
}

#[derive(Debug, Clone)]
pub struct Evidence {
    pub items: Vec<EvidenceItem>,
    pub truncated: bool,
    pub omitted_count: usize,
    pub total_chars: usize,
}

impl Evidence {
    /// §4.7 step 5: formats the evidence block for the synthesis prompt.
    pub fn format(&self, question: &str) -> String {
        let mut out = format!(
            "Question: {}\nEvidence ({} source(s)):\n\n",
            question,
            self.items.len()
        );
        for (i, item) in self.items.iter().enumerate() {
            let positions = if item.scene_positions.is_empty() {
                "none".to_string()
            } else {
                item.scene_positions
                    .iter()
                    .map(|p| (p + 1).to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            out.push_str(&format!(
                "[{}] From {} (Scenes: {}): {}\n\n",
                i + 1,
                item.source_tool,
                positions,
                item.content
            ));
        }
        if self.truncated {
            out.push_str(&format!("...{} lower-relevance results omitted\n", self.omitted_count));
        }
        out
    }
}

/// Extracts scene positions mentioned in `--- SCENE k (index k-1): ... ---`
/// delimiters and `Scene k` mentions, as emitted by the Tool Executor.
fn extract_scene_positions(text: &str) -> Vec<i32> {
    let mut positions = Vec::new();
    let bytes = text.as_bytes();
    let marker = b"index ";
    let mut i = 0;
    while i + marker.len() < bytes.len() {
        if &bytes[i..i + marker.len()] == marker {
            let rest = &text[i + marker.len()..];
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit() || *c == '-').collect();
            if let Ok(n) = digits.parse::<i32>() {
                if !positions.contains(&n) {
                    positions.push(n);
                }
            }
        }
        i += 1;
    }
    positions
}

/// §4.7 step 1: splits batch-tool output on the `--- SCENE k ---`
/// delimiter; other tools produce exactly one item.
fn parse_tool_result(raw: &RawToolResult) -> Vec<EvidenceItem> {
    if (raw.tool_name == "get_scenes" || raw.tool_name == "get_scenes_context") && raw.result_text.contains("--- SCENE") {
        raw.result_text
            .split("\n--- SCENE")
            .skip(1)
            .map(|chunk| {
                let chunk = format!("--- SCENE{}", chunk);
                EvidenceItem {
                    source_tool: raw.tool_name.clone(),
                    scene_positions: extract_scene_positions(&chunk),
                    content: chunk.trim().to_string(),
                    relevance_score: 0.0,
                }
            })
            .collect()
    } else {
        vec![EvidenceItem {
            source_tool: raw.tool_name.clone(),
            scene_positions: extract_scene_positions(&raw.result_text),
            content: raw.result_text.clone(),
            relevance_score: 0.0,
        }]
    }
}

/// §4.7 step 2: normalized token-set overlap between question and item
/// content, plus a phrase-match bonus for the question's first 20 chars.
fn score(question: &str, content: &str) -> f32 {
    let q_tokens: std::collections::HashSet<String> =
        question.to_lowercase().split_whitespace().map(|s| s.to_string()).collect();
    if q_tokens.is_empty() {
        return 0.0;
    }
    let c_tokens: std::collections::HashSet<String> =
        content.to_lowercase().split_whitespace().map(|s| s.to_string()).collect();
    let overlap = q_tokens.intersection(&c_tokens).count() as f32;
    let overlap_score = overlap / q_tokens.len() as f32;

    let prefix: String = question.chars().take(20).collect();
    let phrase_bonus = if !prefix.trim().is_empty() && content.to_lowercase().contains(&prefix.to_lowercase()) {
        0.25
    } else {
        0.0
    };

    (overlap_score + phrase_bonus).min(1.0)
}

/// Builds the ranked, budget-truncated evidence block from accumulated
/// tool results, per the §4.7 algorithm.
pub fn build_evidence(question: &str, raw_results: &[RawToolResult]) -> Evidence {
    let mut items: Vec<EvidenceItem> = raw_results.iter().flat_map(parse_tool_result).collect();
    for item in &mut items {
        item.relevance_score = score(question, &item.content);
    }
    items.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap());

    for item in &mut items {
        if item.content.len() > ITEM_CONTENT_CAP {
            item.content.truncate(ITEM_CONTENT_CAP);
            item.content.push_str("... [truncated]");
        }
    }

    let total_available = items.len();
    let mut kept = Vec::new();
    let mut cumulative_chars = 0usize;
    for item in items.into_iter() {
        if kept.len() >= MAX_ITEMS || cumulative_chars + item.content.len() > TOTAL_CHAR_BUDGET {
            break;
        }
        cumulative_chars += item.content.len();
        kept.push(item);
    }

    let omitted_count = total_available - kept.len();
    Evidence {
        truncated: omitted_count > 0,
        omitted_count,
        total_chars: cumulative_chars,
        items: kept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_batch_results_by_scene_marker() {
        let raw = RawToolResult {
            tool_name: "get_scenes".to_string(),
            tool_input: serde_json::Value::Null,
            result_text: "Requested scenes: 1, 2\n\n--- SCENE 1 (index 0): INT. HOUSE ---\nfoo\n\n--- SCENE 2 (index 1): EXT. STREET ---\nbar\n".to_string(),
        };
        let items = parse_tool_result(&raw);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].scene_positions, vec![0]);
        assert_eq!(items[1].scene_positions, vec![1]);
    }

    #[test]
    fn truncates_to_item_cap_and_reports_omitted() {
        let raw_results: Vec<RawToolResult> = (0..15)
            .map(|i| RawToolResult {
                tool_name: "search_script".to_string(),
                tool_input: serde_json::Value::Null,
                result_text: format!("match number {}", i),
            })
            .collect();
        let evidence = build_evidence("find matches", &raw_results);
        assert!(evidence.items.len() <= MAX_ITEMS);
        assert!(evidence.truncated);
        assert!(evidence.omitted_count > 0);
    }

    #[test]
    fn higher_overlap_scores_higher() {
        assert!(score("what happens to the detective", "the detective confronts the killer") > score("what happens to the detective", "completely unrelated text"));
    }
}
