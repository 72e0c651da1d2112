//! Semantic search over `scene_embeddings`. Grounded on the donor's
//! `memory/archival_new.rs`/`memory/db.rs` raw-SQL pgvector pattern:
//! Diesel's query builder can't express the `<=>` cosine-distance
//! operator, so we drop to `diesel::sql_query` + `QueryableByName`.

use anyhow::Result;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Float4, Int4, Nullable, Text, Uuid as SqlUuid};
use uuid::Uuid;

use crate::Db;

#[derive(QueryableByName, Debug, Clone)]
pub struct SceneMatch {
    #[diesel(sql_type = SqlUuid)]
    pub scene_id: Uuid,
    #[diesel(sql_type = Int4)]
    pub position: i32,
    #[diesel(sql_type = Text)]
    pub heading: String,
    #[diesel(sql_type = Text)]
    pub summary: String,
    #[diesel(sql_type = Float4)]
    pub distance: f32,
}

impl SceneMatch {
    /// Cosine similarity, the inverse of the distance the index returns.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Optional filters for semantic search (§4.2: "optional filters by act,
/// character membership, or 'key scene' flag").
#[derive(Debug, Clone, Default)]
pub struct SemanticFilters {
    pub act: Option<i32>,
    pub key_scene_only: bool,
    pub character: Option<String>,
}

const SEMANTIC_SEARCH_SQL: &str = "
    SELECT s.id AS scene_id, s.position AS position, s.heading AS heading,
           ss.summary AS summary, (se.embedding <=> $1::vector) AS distance
    FROM scene_embeddings se
    JOIN scenes s ON s.id = se.scene_id
    JOIN scene_summaries ss ON ss.scene_id = se.scene_id
    WHERE se.script_id = $2
      AND se.embedding IS NOT NULL
      AND ($3::int4 IS NULL OR se.act = $3)
      AND (NOT $4 OR se.is_key_scene = true)
      AND ($5::text IS NULL OR $5 = ANY(s.characters))
    ORDER BY distance ASC
    LIMIT $6
";

pub struct EmbeddingsDb<'a> {
    pub(crate) db: &'a Db,
}

impl EmbeddingsDb<'_> {
    /// Cosine-distance nearest-neighbor search against `scene_embeddings`,
    /// filtered to `script_id` and joined to scenes/summaries for display.
    /// Embedding generation is assumed to have already happened (§4.2
    /// mandates an embedding-failure short-circuit to empty retrieval
    /// *before* this is ever called — see `RetrievalService`).
    pub fn semantic_search(
        &self,
        script_id: Uuid,
        query_vector: &[f32],
        limit: i64,
        filters: &SemanticFilters,
    ) -> Result<Vec<SceneMatch>> {
        let mut conn = self.db.conn()?;

        let vector_literal = format!(
            "[{}]",
            query_vector
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );

        let results = sql_query(SEMANTIC_SEARCH_SQL)
            .bind::<Text, _>(vector_literal)
            .bind::<SqlUuid, _>(script_id)
            .bind::<Nullable<Int4>, _>(filters.act)
            .bind::<diesel::sql_types::Bool, _>(filters.key_scene_only)
            .bind::<Nullable<Text>, _>(filters.character.clone())
            .bind::<BigInt, _>(limit)
            .load::<SceneMatch>(&mut conn)?;

        Ok(results)
    }
}
