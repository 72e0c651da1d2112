use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::Tool;
use crate::db::embeddings::SemanticFilters;
use crate::retrieval::RetrievalService;

pub struct SearchScriptTool<'a> {
    pub script_id: Uuid,
    pub retrieval: &'a RetrievalService<'a>,
}

#[async_trait]
impl Tool for SearchScriptTool<'_> {
    fn name(&self) -> &'static str {
        "search_script"
    }

    fn description(&self) -> &'static str {
        "Semantic search over scene summaries, with optional act/character/key-scene filters."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "limit": { "type": "integer", "default": 10 },
                "act": { "type": "integer" },
                "key_scene_only": { "type": "boolean", "default": false },
                "character": { "type": "string" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> String {
        let Some(query) = input.get("query").and_then(|v| v.as_str()) else {
            return "Error: 'query' is required.".to_string();
        };
        let limit = input.get("limit").and_then(|v| v.as_i64()).unwrap_or(10);
        let filters = SemanticFilters {
            act: input.get("act").and_then(|v| v.as_i64()).map(|v| v as i32),
            key_scene_only: input.get("key_scene_only").and_then(|v| v.as_bool()).unwrap_or(false),
            character: input.get("character").and_then(|v| v.as_str()).map(|s| s.to_string()),
        };

        let matches = match self.retrieval.semantic_matches(self.script_id, query, limit, Some(filters)).await {
            Ok(matches) => matches,
            Err(e) => return format!("Error: search failed: {}", e),
        };
        if matches.is_empty() {
            return format!("No scenes matched '{}'.", query);
        }

        let mut out = format!("Top {} matches for '{}':\n", matches.len(), query);
        for m in &matches {
            out.push_str(&format!(
                "- Scene {} (index {}): {} — relevance {:.2}\n  {}\n",
                m.position + 1,
                m.position,
                m.heading,
                m.similarity(),
                m.summary
            ));
        }
        out
    }
}
