//! Conversation CRUD (core-owned). Grounded on the donor's
//! `agent_manager.rs::get_or_create_context` lookup-then-insert idiom.

use anyhow::Result;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::chat_conversations;
use crate::Db;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = chat_conversations)]
pub struct Conversation {
    pub id: Uuid,
    pub script_id: Uuid,
    pub user_id: String,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = chat_conversations)]
struct NewConversation {
    id: Uuid,
    script_id: Uuid,
    user_id: String,
}

pub struct ConversationsDb<'a> {
    pub(crate) db: &'a Db,
}

impl ConversationsDb<'_> {
    /// `get_or_create(conversation_id?, user, script) -> Conversation` (§4.4).
    pub fn get_or_create(
        &self,
        conversation_id: Option<Uuid>,
        user_id: &str,
        script_id: Uuid,
    ) -> Result<Conversation> {
        let mut conn = self.db.conn()?;

        if let Some(id) = conversation_id {
            if let Some(existing) = chat_conversations::table
                .filter(chat_conversations::id.eq(id))
                .select(Conversation::as_select())
                .first(&mut conn)
                .optional()?
            {
                return Ok(existing);
            }
        }

        let new_id = conversation_id.unwrap_or_else(Uuid::new_v4);
        let new_row = NewConversation {
            id: new_id,
            script_id,
            user_id: user_id.to_string(),
        };
        diesel::insert_into(chat_conversations::table)
            .values(&new_row)
            .execute(&mut conn)?;

        Ok(Conversation {
            id: new_id,
            script_id,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn get(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        let mut conn = self.db.conn()?;
        Ok(chat_conversations::table
            .filter(chat_conversations::id.eq(conversation_id))
            .select(Conversation::as_select())
            .first(&mut conn)
            .optional()?)
    }
}
