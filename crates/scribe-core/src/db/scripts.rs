//! Read-only access to ingestion-owned Script/Scene/SceneSummary rows.
//! The core never writes these tables (spec.md §3), so no `Insertable`
//! path exists here — only `Queryable` selects.

use anyhow::Result;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{scene_summaries, scenes, scripts};
use crate::Db;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = scripts)]
pub struct Script {
    pub id: Uuid,
    pub title: String,
    pub owner_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = scenes)]
pub struct Scene {
    pub id: Uuid,
    pub script_id: Uuid,
    pub position: i32,
    pub heading: String,
    pub content: String,
    pub word_count: i32,
    pub characters: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Scene {
    /// User-facing 1-based scene number.
    pub fn user_number(&self) -> i32 {
        self.position + 1
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = scene_summaries)]
pub struct SceneSummary {
    pub scene_id: Uuid,
    pub script_id: Uuid,
    pub summary: String,
    pub is_stale: bool,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub struct ScriptsDb<'a> {
    pub(crate) db: &'a Db,
}

impl ScriptsDb<'_> {
    pub fn get_script(&self, script_id: Uuid) -> Result<Option<Script>> {
        let mut conn = self.db.conn()?;
        Ok(scripts::table
            .filter(scripts::id.eq(script_id))
            .select(Script::as_select())
            .first(&mut conn)
            .optional()?)
    }

    pub fn scene_count(&self, script_id: Uuid) -> Result<i64> {
        let mut conn = self.db.conn()?;
        Ok(scenes::table
            .filter(scenes::script_id.eq(script_id))
            .count()
            .get_result(&mut conn)?)
    }

    pub fn get_scene_by_position(&self, script_id: Uuid, position: i32) -> Result<Option<Scene>> {
        let mut conn = self.db.conn()?;
        Ok(scenes::table
            .filter(scenes::script_id.eq(script_id))
            .filter(scenes::position.eq(position))
            .select(Scene::as_select())
            .first(&mut conn)
            .optional()?)
    }

    pub fn get_scenes_by_positions(&self, script_id: Uuid, positions: &[i32]) -> Result<Vec<Scene>> {
        let mut conn = self.db.conn()?;
        Ok(scenes::table
            .filter(scenes::script_id.eq(script_id))
            .filter(scenes::position.eq_any(positions))
            .select(Scene::as_select())
            .order(scenes::position.asc())
            .load(&mut conn)?)
    }

    /// All scenes for a script, ordered by position (used for pacing analysis).
    pub fn all_scenes(&self, script_id: Uuid) -> Result<Vec<Scene>> {
        let mut conn = self.db.conn()?;
        Ok(scenes::table
            .filter(scenes::script_id.eq(script_id))
            .select(Scene::as_select())
            .order(scenes::position.asc())
            .load(&mut conn)?)
    }

    pub fn scenes_with_character(&self, script_id: Uuid, normalized_name: &str) -> Result<Vec<Scene>> {
        let mut conn = self.db.conn()?;
        // characters column is normalized at ingestion time; filter in Rust
        // since Diesel's array `@>` contains operator needs raw SQL for
        // case-sensitivity control we already did at ingestion.
        let all: Vec<Scene> = scenes::table
            .filter(scenes::script_id.eq(script_id))
            .select(Scene::as_select())
            .order(scenes::position.asc())
            .load(&mut conn)?;
        Ok(all
            .into_iter()
            .filter(|s| s.characters.iter().any(|c| c == normalized_name))
            .collect())
    }

    pub fn get_summary(&self, scene_id: Uuid) -> Result<Option<SceneSummary>> {
        let mut conn = self.db.conn()?;
        Ok(scene_summaries::table
            .filter(scene_summaries::scene_id.eq(scene_id))
            .select(SceneSummary::as_select())
            .first(&mut conn)
            .optional()?)
    }

    pub fn get_summaries_for_scenes(&self, scene_ids: &[Uuid]) -> Result<Vec<SceneSummary>> {
        let mut conn = self.db.conn()?;
        Ok(scene_summaries::table
            .filter(scene_summaries::scene_id.eq_any(scene_ids))
            .select(SceneSummary::as_select())
            .load(&mut conn)?)
    }
}
