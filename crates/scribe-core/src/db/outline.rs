//! Read-only access to ScriptOutline and CharacterSheet.

use anyhow::Result;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{character_sheets, script_outlines};
use crate::Db;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = script_outlines)]
pub struct ScriptOutline {
    pub script_id: Uuid,
    pub content: serde_json::Value,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = character_sheets)]
pub struct CharacterSheet {
    pub script_id: Uuid,
    pub name_normalized: String,
    pub arc: Option<String>,
    pub relationships: serde_json::Value,
    pub appearance_count: i32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub struct OutlineDb<'a> {
    pub(crate) db: &'a Db,
}

impl OutlineDb<'_> {
    pub fn get_outline(&self, script_id: Uuid) -> Result<Option<ScriptOutline>> {
        let mut conn = self.db.conn()?;
        Ok(script_outlines::table
            .filter(script_outlines::script_id.eq(script_id))
            .select(ScriptOutline::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// Top-N character sheets by appearance count, for the Context
    /// Builder's global-context layer (§4.3).
    pub fn top_character_sheets(&self, script_id: Uuid, n: i64) -> Result<Vec<CharacterSheet>> {
        let mut conn = self.db.conn()?;
        Ok(character_sheets::table
            .filter(character_sheets::script_id.eq(script_id))
            .order(character_sheets::appearance_count.desc())
            .limit(n)
            .select(CharacterSheet::as_select())
            .load(&mut conn)?)
    }

    pub fn get_character_sheet(
        &self,
        script_id: Uuid,
        name_normalized: &str,
    ) -> Result<Option<CharacterSheet>> {
        let mut conn = self.db.conn()?;
        Ok(character_sheets::table
            .filter(character_sheets::script_id.eq(script_id))
            .filter(character_sheets::name_normalized.eq(name_normalized))
            .select(CharacterSheet::as_select())
            .first(&mut conn)
            .optional()?)
    }
}
