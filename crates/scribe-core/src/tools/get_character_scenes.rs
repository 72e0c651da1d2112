use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::Tool;
use crate::Db;

pub struct GetCharacterScenesTool<'a> {
    pub script_id: Uuid,
    pub db: &'a Db,
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

#[async_trait]
impl Tool for GetCharacterScenesTool<'_> {
    fn name(&self) -> &'static str {
        "get_character_scenes"
    }

    fn description(&self) -> &'static str {
        "List the scenes, in order, that a named character appears in."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "character_name": { "type": "string" },
                "include_full_text": { "type": "boolean", "default": false }
            },
            "required": ["character_name"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> String {
        let Some(name) = input.get("character_name").and_then(|v| v.as_str()) else {
            return "Error: 'character_name' is required.".to_string();
        };
        let include_full_text = input.get("include_full_text").and_then(|v| v.as_bool()).unwrap_or(false);
        let normalized = normalize(name);

        let scenes = match self.db.scripts().scenes_with_character(self.script_id, &normalized) {
            Ok(scenes) => scenes,
            Err(e) => return format!("Error: failed to load scenes for '{}': {}", name, e),
        };
        if scenes.is_empty() {
            return format!("No scenes found for character '{}'.", name);
        }

        let mut out = format!("Scenes featuring {} ({} total):\n", normalized, scenes.len());
        for scene in &scenes {
            if include_full_text {
                out.push_str(&format!(
                    "\n--- SCENE {} (index {}): {} ---\n{}\n",
                    scene.user_number(),
                    scene.position,
                    scene.heading,
                    scene.content
                ));
            } else {
                out.push_str(&format!(
                    "Scene {} (index {}): {}\n",
                    scene.user_number(),
                    scene.position,
                    scene.heading
                ));
            }
        }
        out
    }
}
