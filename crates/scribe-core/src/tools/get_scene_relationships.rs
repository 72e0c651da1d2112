use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::Tool;
use crate::Db;

pub struct GetSceneRelationshipsTool<'a> {
    pub script_id: Uuid,
    pub db: &'a Db,
}

#[async_trait]
impl Tool for GetSceneRelationshipsTool<'_> {
    fn name(&self) -> &'static str {
        "get_scene_relationships"
    }

    fn description(&self) -> &'static str {
        "List scene-to-scene relationships (setup/payoff, callback, parallel, echo) with user-facing scene numbers."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "relationship_type": {
                    "type": "string",
                    "enum": ["setup_payoff", "callback", "parallel", "echo"]
                }
            }
        })
    }

    async fn execute(&self, input: serde_json::Value) -> String {
        let relationship_type = input.get("relationship_type").and_then(|v| v.as_str());
        let relationships = match self.db.threads().list_scene_relationships(self.script_id, relationship_type) {
            Ok(rels) => rels,
            Err(e) => return format!("Error: failed to load scene relationships: {}", e),
        };
        if relationships.is_empty() {
            return "No scene relationships found.".to_string();
        }

        let mut out = format!("{} relationship(s):\n", relationships.len());
        for r in &relationships {
            out.push_str(&format!(
                "- {} : Scene {} (index {}) -> Scene {} (index {})\n",
                r.relationship_type,
                r.setup_position + 1,
                r.setup_position,
                r.payoff_position + 1,
                r.payoff_position
            ));
        }
        out
    }
}
