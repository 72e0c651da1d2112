//! WorkingSet CRUD — per-conversation short-term memory (§3, §4.4).

use anyhow::Result;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::working_sets;
use crate::Db;

#[derive(Queryable, Selectable, Debug, Clone, Default)]
#[diesel(table_name = working_sets)]
pub struct WorkingSet {
    pub conversation_id: Uuid,
    pub active_scene_positions: Vec<i32>,
    pub active_characters: Vec<String>,
    pub active_threads: Vec<String>,
    pub last_user_intent: Option<String>,
    pub last_assistant_commitment: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = working_sets)]
struct WorkingSetRow {
    conversation_id: Uuid,
    active_scene_positions: Vec<i32>,
    active_characters: Vec<String>,
    active_threads: Vec<String>,
    last_user_intent: Option<String>,
    last_assistant_commitment: Option<String>,
}

pub struct WorkingSetDb<'a> {
    pub(crate) db: &'a Db,
}

impl WorkingSetDb<'_> {
    pub fn get(&self, conversation_id: Uuid) -> Result<Option<WorkingSet>> {
        let mut conn = self.db.conn()?;
        Ok(working_sets::table
            .filter(working_sets::conversation_id.eq(conversation_id))
            .select(WorkingSet::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// `update_working_set(conversation_id, assistant_response, tool_uses) -> WorkingSet` (§4.4).
    /// Upserts: insert on first exchange, overwrite thereafter.
    pub fn upsert(&self, ws: &WorkingSet) -> Result<()> {
        let mut conn = self.db.conn()?;
        let row = WorkingSetRow {
            conversation_id: ws.conversation_id,
            active_scene_positions: ws.active_scene_positions.clone(),
            active_characters: ws.active_characters.clone(),
            active_threads: ws.active_threads.clone(),
            last_user_intent: ws.last_user_intent.clone(),
            last_assistant_commitment: ws.last_assistant_commitment.clone(),
        };
        diesel::insert_into(working_sets::table)
            .values(&row)
            .on_conflict(working_sets::conversation_id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}
