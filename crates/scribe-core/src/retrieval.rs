//! Retrieval Service (§4.2): returns an ordered list of Scene+SceneSummary
//! pairs appropriate to the router's intent. Grounded on the donor's
//! `memory/archival_new.rs` semantic-query dispatch, generalized from a
//! single "archival search" path into the five intent-keyed strategies
//! below.

use anyhow::Result;
use uuid::Uuid;

use crate::db::embeddings::{SemanticFilters, SceneMatch};
use crate::db::scripts::{Scene, SceneSummary};
use crate::embedding_client::EmbeddingClient;
use crate::router::Intent;
use crate::Db;

#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub scene: Scene,
    pub summary: Option<SceneSummary>,
    pub relevance_score: f32,
}

pub struct RetrievalService<'a> {
    pub db: &'a Db,
    pub embeddings: &'a EmbeddingClient,
}

impl<'a> RetrievalService<'a> {
    pub fn new(db: &'a Db, embeddings: &'a EmbeddingClient) -> Self {
        Self { db, embeddings }
    }

    pub async fn retrieve_for_intent(
        &self,
        script_id: Uuid,
        message: &str,
        intent: Intent,
        current_scene_position: Option<i32>,
    ) -> Result<Vec<RetrievalResult>> {
        match intent {
            Intent::LocalEdit => self.positional(script_id, message, current_scene_position).await,
            Intent::SceneFeedback => self.hybrid(script_id, message, current_scene_position).await,
            Intent::GlobalQuestion | Intent::NarrativeAnalysis => self.semantic(script_id, message, 10).await,
            Intent::Brainstorm => Ok(Vec::new()),
        }
    }

    /// `local_edit`: current scene + one neighbor on each side (3 scenes).
    /// §8 boundary: an out-of-range (or absent) `current_scene_position`
    /// falls back to the semantic strategy instead of returning nothing.
    async fn positional(
        &self,
        script_id: Uuid,
        message: &str,
        current_scene_position: Option<i32>,
    ) -> Result<Vec<RetrievalResult>> {
        if let Some(position) = current_scene_position {
            let positions = [position - 1, position, position + 1];
            let scenes = self.db.scripts().get_scenes_by_positions(script_id, &positions)?;
            if !scenes.is_empty() {
                return self.pair_with_summaries(script_id, scenes, 1.0);
            }
        }
        self.semantic(script_id, message, 10).await
    }

    /// `scene_feedback`: current scene + top-5 semantic matches, deduped.
    async fn hybrid(
        &self,
        script_id: Uuid,
        message: &str,
        current_scene_position: Option<i32>,
    ) -> Result<Vec<RetrievalResult>> {
        let mut results = Vec::new();
        let mut seen = std::collections::HashSet::new();

        if let Some(position) = current_scene_position {
            if let Some(scene) = self.db.scripts().get_scene_by_position(script_id, position)? {
                seen.insert(scene.id);
                let summary = self.db.scripts().get_summary(scene.id)?;
                results.push(RetrievalResult {
                    scene,
                    summary,
                    relevance_score: 1.0,
                });
            }
        }

        let matches = self.semantic_matches(script_id, message, 5, None).await?;
        for m in matches {
            if seen.insert(m.scene_id) {
                if let Some(scene) = self.db.scripts().get_scenes_by_positions(script_id, &[m.position])?.into_iter().next() {
                    let summary = self.db.scripts().get_summary(scene.id)?;
                    results.push(RetrievalResult {
                        scene,
                        summary,
                        relevance_score: m.similarity(),
                    });
                }
            }
        }
        Ok(results)
    }

    /// `global_question` / `narrative_analysis`: top-N by cosine similarity.
    async fn semantic(&self, script_id: Uuid, message: &str, limit: i64) -> Result<Vec<RetrievalResult>> {
        let matches = self.semantic_matches(script_id, message, limit, None).await?;
        let positions: Vec<i32> = matches.iter().map(|m| m.position).collect();
        let scenes = self.db.scripts().get_scenes_by_positions(script_id, &positions)?;
        let scored: std::collections::HashMap<i32, f32> =
            matches.iter().map(|m| (m.position, m.similarity())).collect();

        let mut results = Vec::with_capacity(scenes.len());
        for scene in scenes {
            let relevance_score = scored.get(&scene.position).copied().unwrap_or(0.0);
            let summary = self.db.scripts().get_summary(scene.id)?;
            results.push(RetrievalResult {
                scene,
                summary,
                relevance_score,
            });
        }
        results.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap());
        Ok(results)
    }

    /// §4.2 "Semantic search" / `search_script` tool delegate: embeds the
    /// message, runs the cosine-distance query, and falls back to an empty
    /// result on embedding failure rather than failing the whole request.
    pub async fn semantic_matches(
        &self,
        script_id: Uuid,
        message: &str,
        limit: i64,
        filters: Option<SemanticFilters>,
    ) -> Result<Vec<SceneMatch>> {
        let embedding = match self.embeddings.embed(message).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!("embedding generation failed, falling back to empty retrieval: {}", e);
                return Ok(Vec::new());
            }
        };
        let filters = filters.unwrap_or_default();
        self.db
            .embeddings()
            .semantic_search(script_id, &embedding, limit, &filters)
    }

    fn pair_with_summaries(
        &self,
        script_id: Uuid,
        scenes: Vec<Scene>,
        score: f32,
    ) -> Result<Vec<RetrievalResult>> {
        let _ = script_id;
        let mut results = Vec::with_capacity(scenes.len());
        for scene in scenes {
            let summary = self.db.scripts().get_summary(scene.id)?;
            results.push(RetrievalResult {
                scene,
                summary,
                relevance_score: score,
            });
        }
        Ok(results)
    }
}
