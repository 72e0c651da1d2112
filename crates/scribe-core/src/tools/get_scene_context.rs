use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::{cap_content, Tool};
use crate::Db;

pub struct GetSceneContextTool<'a> {
    pub script_id: Uuid,
    pub db: &'a Db,
    pub max_chars: usize,
}

#[async_trait]
impl Tool for GetSceneContextTool<'_> {
    fn name(&self) -> &'static str {
        "get_scene_context"
    }

    fn description(&self) -> &'static str {
        "Fetch a target scene plus its neighbors on each side, for local continuity."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "scene_index": { "type": "integer" },
                "neighbor_count": { "type": "integer", "default": 1 }
            },
            "required": ["scene_index"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> String {
        let Some(target) = input.get("scene_index").and_then(|v| v.as_i64()) else {
            return "Error: 'scene_index' is required and must be an integer.".to_string();
        };
        let neighbor_count = input.get("neighbor_count").and_then(|v| v.as_i64()).unwrap_or(1).max(0);
        let target = target as i32;
        let n = neighbor_count as i32;

        let positions: Vec<i32> = (target - n..=target + n).collect();
        let scenes = match self.db.scripts().get_scenes_by_positions(self.script_id, &positions) {
            Ok(scenes) => scenes,
            Err(e) => return format!("Error: failed to load scene context: {}", e),
        };
        if scenes.is_empty() {
            return format!("Error: no scene found at index {}.", target);
        }

        let mut out = String::new();
        for scene in &scenes {
            let marker = if scene.position == target { " [TARGET]" } else { "" };
            out.push_str(&format!(
                "\n--- SCENE {} (index {}){}: {} ---\n{}\n",
                scene.user_number(),
                scene.position,
                marker,
                scene.heading,
                cap_content(&scene.content, self.max_chars)
            ));
        }
        out
    }
}
