use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::{cap_content, Tool};
use crate::Db;

pub struct GetScenesTool<'a> {
    pub script_id: Uuid,
    pub db: &'a Db,
    pub max_chars: usize,
}

#[async_trait]
impl Tool for GetScenesTool<'_> {
    fn name(&self) -> &'static str {
        "get_scenes"
    }

    fn description(&self) -> &'static str {
        "Fetch multiple scenes (up to 10) by 0-based scene index in one call."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "scene_indices": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "maxItems": 10,
                    "description": "0-based scene positions"
                },
                "max_chars_per_scene": { "type": "integer" }
            },
            "required": ["scene_indices"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> String {
        let Some(indices) = input.get("scene_indices").and_then(|v| v.as_array()) else {
            return "Error: 'scene_indices' is required and must be an array.".to_string();
        };
        let positions: Vec<i32> = indices.iter().filter_map(|v| v.as_i64()).map(|v| v as i32).take(10).collect();
        if positions.is_empty() {
            return "Error: 'scene_indices' must contain at least one integer.".to_string();
        }
        let max_chars = input
            .get("max_chars_per_scene")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(self.max_chars);

        let scenes = match self.db.scripts().get_scenes_by_positions(self.script_id, &positions) {
            Ok(scenes) => scenes,
            Err(e) => return format!("Error: failed to load scenes: {}", e),
        };

        let user_numbers: Vec<String> = positions.iter().map(|p| (p + 1).to_string()).collect();
        let mut out = format!("Requested scenes (user numbers): {}\n", user_numbers.join(", "));

        for position in &positions {
            match scenes.iter().find(|s| s.position == *position) {
                Some(scene) => {
                    let body = if scene.content.trim().is_empty() {
                        match self.db.scripts().get_summary(scene.id) {
                            Ok(Some(summary)) => format!("[Summary] {}", cap_content(&summary.summary, max_chars)),
                            Ok(None) => "[Summary] (none available)".to_string(),
                            Err(e) => format!("Error: failed to load summary: {}", e),
                        }
                    } else {
                        cap_content(&scene.content, max_chars)
                    };
                    out.push_str(&format!(
                        "\n--- SCENE {} (index {}): {} ---\n{}\n",
                        scene.user_number(),
                        scene.position,
                        scene.heading,
                        body
                    ));
                }
                None => {
                    out.push_str(&format!("\n--- SCENE (index {}): [missing] ---\n", position));
                }
            }
        }
        out
    }
}
