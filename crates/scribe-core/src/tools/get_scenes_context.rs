use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::{cap_content, Tool};
use crate::Db;

pub struct GetScenesContextTool<'a> {
    pub script_id: Uuid,
    pub db: &'a Db,
    pub max_chars: usize,
}

#[async_trait]
impl Tool for GetScenesContextTool<'_> {
    fn name(&self) -> &'static str {
        "get_scenes_context"
    }

    fn description(&self) -> &'static str {
        "Fetch the union of context windows (target + neighbors) for multiple scenes, deduplicated."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "scene_indices": { "type": "array", "items": { "type": "integer" } },
                "neighbor_count": { "type": "integer", "default": 1 }
            },
            "required": ["scene_indices"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> String {
        let Some(indices) = input.get("scene_indices").and_then(|v| v.as_array()) else {
            return "Error: 'scene_indices' is required and must be an array.".to_string();
        };
        let targets: Vec<i32> = indices.iter().filter_map(|v| v.as_i64()).map(|v| v as i32).collect();
        if targets.is_empty() {
            return "Error: 'scene_indices' must contain at least one integer.".to_string();
        }
        let neighbor_count = input.get("neighbor_count").and_then(|v| v.as_i64()).unwrap_or(1).max(0) as i32;

        let mut positions = BTreeSet::new();
        for target in &targets {
            for p in (target - neighbor_count)..=(target + neighbor_count) {
                positions.insert(p);
            }
        }
        let positions: Vec<i32> = positions.into_iter().collect();
        let targets_set: BTreeSet<i32> = targets.into_iter().collect();

        let scenes = match self.db.scripts().get_scenes_by_positions(self.script_id, &positions) {
            Ok(scenes) => scenes,
            Err(e) => return format!("Error: failed to load scene context: {}", e),
        };
        if scenes.is_empty() {
            return "Error: no scenes found for the requested indices.".to_string();
        }

        let mut out = String::new();
        for scene in &scenes {
            let marker = if targets_set.contains(&scene.position) { " [TARGET]" } else { "" };
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
