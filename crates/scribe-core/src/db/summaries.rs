//! ConversationSummary CRUD. Grounded on the donor's
//! `memory/db.rs::SummaryDb` shape.

use anyhow::Result;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::conversation_summaries;
use crate::Db;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = conversation_summaries)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub covered_through_sequence_id: i64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = conversation_summaries)]
struct NewSummary {
    id: Uuid,
    conversation_id: Uuid,
    covered_through_sequence_id: i64,
    content: String,
}

pub struct SummariesDb<'a> {
    pub(crate) db: &'a Db,
}

impl SummariesDb<'_> {
    pub fn latest(&self, conversation_id: Uuid) -> Result<Option<ConversationSummary>> {
        let mut conn = self.db.conn()?;
        Ok(conversation_summaries::table
            .filter(conversation_summaries::conversation_id.eq(conversation_id))
            .order(conversation_summaries::covered_through_sequence_id.desc())
            .select(ConversationSummary::as_select())
            .first(&mut conn)
            .optional()?)
    }

    pub fn insert(
        &self,
        conversation_id: Uuid,
        covered_through_sequence_id: i64,
        content: &str,
    ) -> Result<ConversationSummary> {
        let mut conn = self.db.conn()?;
        let id = Uuid::new_v4();
        let row = NewSummary {
            id,
            conversation_id,
            covered_through_sequence_id,
            content: content.to_string(),
        };
        diesel::insert_into(conversation_summaries::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(ConversationSummary {
            id,
            conversation_id,
            covered_through_sequence_id,
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        })
    }
}
