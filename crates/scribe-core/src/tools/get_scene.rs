use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::{cap_content, Tool};
use crate::Db;

pub struct GetSceneTool<'a> {
    pub script_id: Uuid,
    pub db: &'a Db,
    pub max_chars: usize,
}

#[async_trait]
impl Tool for GetSceneTool<'_> {
    fn name(&self) -> &'static str {
        "get_scene"
    }

    fn description(&self) -> &'static str {
        "Fetch a single scene's heading and full content by 0-based scene index."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "scene_index": { "type": "integer", "description": "0-based scene position" }
            },
            "required": ["scene_index"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> String {
        let Some(position) = input.get("scene_index").and_then(|v| v.as_i64()) else {
            return "Error: 'scene_index' is required and must be an integer.".to_string();
        };

        match self.db.scripts().get_scene_by_position(self.script_id, position as i32) {
            Ok(Some(scene)) => {
                let body = if scene.content.trim().is_empty() {
                    match self.db.scripts().get_summary(scene.id) {
                        Ok(Some(summary)) => format!("[Summary] {}", cap_content(&summary.summary, self.max_chars)),
                        Ok(None) => "[Summary] (none available)".to_string(),
                        Err(e) => return format!("Error: failed to load summary: {}", e),
                    }
                } else {
                    cap_content(&scene.content, self.max_chars)
                };
                format!(
                    "Scene {} (index {}): {}\n\n{}",
                    scene.user_number(),
                    scene.position,
                    scene.heading,
                    body
                )
            }
            Ok(None) => format!("Error: no scene found at index {}.", position),
            Err(e) => format!("Error: failed to load scene: {}", e),
        }
    }
}
