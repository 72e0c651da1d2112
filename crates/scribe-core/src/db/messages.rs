//! Message CRUD. Grounded on the donor's `memory/db.rs::MessageDb`, minus
//! the embedding column (no per-message semantic recall in this domain).

use anyhow::Result;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::chat_messages;
use crate::Db;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = chat_messages)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: String,
    pub content: String,
    pub sequence_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = chat_messages)]
struct NewMessage {
    id: Uuid,
    conversation_id: Uuid,
    role: String,
    content: String,
    sequence_id: i64,
}

pub struct MessagesDb<'a> {
    pub(crate) db: &'a Db,
}

impl MessagesDb<'_> {
    pub fn count(&self, conversation_id: Uuid) -> Result<i64> {
        let mut conn = self.db.conn()?;
        Ok(chat_messages::table
            .filter(chat_messages::conversation_id.eq(conversation_id))
            .count()
            .get_result(&mut conn)?)
    }

    /// `recent_messages(conversation_id, limit) -> [Message]` (§4.4), oldest first.
    pub fn recent_messages(&self, conversation_id: Uuid, limit: i64) -> Result<Vec<Message>> {
        let mut conn = self.db.conn()?;
        let mut rows: Vec<Message> = chat_messages::table
            .filter(chat_messages::conversation_id.eq(conversation_id))
            .order(chat_messages::sequence_id.desc())
            .limit(limit)
            .select(Message::as_select())
            .load(&mut conn)?;
        rows.reverse();
        Ok(rows)
    }

    /// Persist the user+assistant exchange atomically per spec §5 ("either
    /// both are written or neither"). Returns the two inserted rows.
    pub fn insert_exchange(
        &self,
        conversation_id: Uuid,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<(Message, Message)> {
        let mut conn = self.db.conn()?;
        conn.transaction(|conn| -> diesel::result::QueryResult<(Message, Message)> {
            let next_seq: i64 = chat_messages::table
                .filter(chat_messages::conversation_id.eq(conversation_id))
                .select(diesel::dsl::max(chat_messages::sequence_id))
                .first::<Option<i64>>(conn)?
                .map(|m| m + 1)
                .unwrap_or(0);

            let user_row = NewMessage {
                id: Uuid::new_v4(),
                conversation_id,
                role: "user".to_string(),
                content: user_content.to_string(),
                sequence_id: next_seq,
            };
            let assistant_row = NewMessage {
                id: Uuid::new_v4(),
                conversation_id,
                role: "assistant".to_string(),
                content: assistant_content.to_string(),
                sequence_id: next_seq + 1,
            };

            diesel::insert_into(chat_messages::table)
                .values(&user_row)
                .execute(conn)?;
            diesel::insert_into(chat_messages::table)
                .values(&assistant_row)
                .execute(conn)?;

            let inserted: Vec<Message> = chat_messages::table
                .filter(chat_messages::id.eq_any([user_row.id, assistant_row.id]))
                .order(chat_messages::sequence_id.asc())
                .select(Message::as_select())
                .load(conn)?;

            Ok((inserted[0].clone(), inserted[1].clone()))
        })
        .map_err(anyhow::Error::from)
    }
}
