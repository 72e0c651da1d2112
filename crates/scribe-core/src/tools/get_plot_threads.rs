use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::Tool;
use crate::Db;

pub struct GetPlotThreadsTool<'a> {
    pub script_id: Uuid,
    pub db: &'a Db,
}

#[async_trait]
impl Tool for GetPlotThreadsTool<'_> {
    fn name(&self) -> &'static str {
        "get_plot_threads"
    }

    fn description(&self) -> &'static str {
        "List plot threads (character arcs, plot lines, subplots, themes) and the scenes they run through."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "thread_type": {
                    "type": "string",
                    "enum": ["character_arc", "plot", "subplot", "theme"]
                }
            }
        })
    }

    async fn execute(&self, input: serde_json::Value) -> String {
        let thread_type = input.get("thread_type").and_then(|v| v.as_str());
        let threads = match self.db.threads().list_plot_threads(self.script_id, thread_type) {
            Ok(threads) => threads,
            Err(e) => return format!("Error: failed to load plot threads: {}", e),
        };
        if threads.is_empty() {
            return "No plot threads found.".to_string();
        }

        let mut out = format!("{} plot thread(s):\n", threads.len());
        for t in &threads {
            let user_numbers: Vec<String> = t.scene_positions.iter().map(|p| (p + 1).to_string()).collect();
            out.push_str(&format!(
                "- {} ({}): scenes {}\n",
                t.name,
                t.thread_type,
                user_numbers.join(", ")
            ));
        }
        out
    }
}
