//! Tool Executor (§4.5): nine screenplay tools callable from the agent
//! loop, each scoped to the script id bound at construction and each
//! returning a human-readable structured string rather than raising.
//! Grounded on the donor's `tools.rs::canonical_tool_descriptions` frozen-
//! prompt-contract idiom (name/description/schema triplet) and
//! `memory/tools.rs`'s per-tool struct shape.

mod analyze_pacing;
mod get_character_scenes;
mod get_plot_threads;
mod get_scene;
mod get_scene_context;
mod get_scene_relationships;
mod get_scenes;
mod get_scenes_context;
mod search_script;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::ToolCaps;
use crate::retrieval::RetrievalService;
use crate::Db;

/// Per-tool soft timeout (§5: "on timeout the tool returns an error string,
/// not an exception").
const TOOL_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> serde_json::Value;
    async fn execute(&self, input: serde_json::Value) -> String;
}

/// The name of the "synthesis signal" tool -- not one of the nine scene
/// tools, so it has no `Tool` impl and `execute()` never dispatches to it.
/// `agent_loop::run` inspects tool-call names for this one directly and
/// exits to synthesis immediately (§4.6 exit path 2) instead of routing it
/// through the executor.
pub const DONE_TOOL_NAME: &str = "done";

pub struct ToolExecutor<'a> {
    pub script_id: Uuid,
    pub db: &'a Db,
    pub retrieval: &'a RetrievalService<'a>,
    pub caps: ToolCaps,
    tools: Vec<Box<dyn Tool + 'a>>,
}

impl<'a> ToolExecutor<'a> {
    pub fn new(script_id: Uuid, db: &'a Db, retrieval: &'a RetrievalService<'a>, caps: ToolCaps) -> Self {
        let tools: Vec<Box<dyn Tool + 'a>> = vec![
            Box::new(get_scene::GetSceneTool { script_id, db, max_chars: caps.get_scene_chars }),
            Box::new(get_scenes::GetScenesTool { script_id, db, max_chars: caps.context_batch_chars }),
            Box::new(get_scene_context::GetSceneContextTool { script_id, db, max_chars: caps.context_batch_chars }),
            Box::new(get_scenes_context::GetScenesContextTool { script_id, db, max_chars: caps.context_batch_chars }),
            Box::new(get_character_scenes::GetCharacterScenesTool { script_id, db }),
            Box::new(search_script::SearchScriptTool { script_id, retrieval }),
            Box::new(analyze_pacing::AnalyzePacingTool { script_id, db }),
            Box::new(get_plot_threads::GetPlotThreadsTool { script_id, db }),
            Box::new(get_scene_relationships::GetSceneRelationshipsTool { script_id, db }),
        ];
        Self { script_id, db, retrieval, caps, tools }
    }

    pub fn definitions(&self) -> Vec<crate::llm::ToolDefinition> {
        let mut defs: Vec<crate::llm::ToolDefinition> = self
            .tools
            .iter()
            .map(|t| crate::llm::ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        defs.push(crate::llm::ToolDefinition {
            name: DONE_TOOL_NAME.to_string(),
            description: "Call this once you have gathered enough evidence to answer the question, \
                          instead of calling another scene tool. Exits tool use and proceeds straight \
                          to writing the answer."
                .to_string(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        });
        defs
    }

    /// Runs a named tool under the §5 soft timeout; never returns `Err` to
    /// the caller -- a timeout or unknown-tool name becomes an error
    /// string the model reads like any other tool result.
    pub async fn execute(&self, name: &str, input: serde_json::Value) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return format!("Error: unknown tool '{}'.", name);
        };

        match tokio::time::timeout(TOOL_TIMEOUT, tool.execute(input)).await {
            Ok(result) => result,
            Err(_) => format!("Error: tool '{}' timed out after {}s.", name, TOOL_TIMEOUT.as_secs()),
        }
    }
}

/// Caps `content` at `max_chars`, appending an explicit truncation marker
/// (§4.5 output-format policy).
pub(crate) fn cap_content(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        content.to_string()
    } else {
        let mut truncated = content.chars().take(max_chars).collect::<String>();
        truncated.push_str("... [truncated]");
        truncated
    }
}
