//! Append-only TokenUsageRow (§3, §6 pricing model, §8 invariant 6).

use anyhow::Result;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::token_usage_rows;
use crate::Db;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = token_usage_rows)]
pub struct TokenUsageRow {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub input_tokens: i64,
    pub cache_creation_tokens: i64,
    pub cache_read_tokens: i64,
    pub output_tokens: i64,
    pub cost_minor_units: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = token_usage_rows)]
struct NewTokenUsageRow {
    id: Uuid,
    conversation_id: Uuid,
    input_tokens: i64,
    cache_creation_tokens: i64,
    cache_read_tokens: i64,
    output_tokens: i64,
    cost_minor_units: i64,
}

pub struct UsageDb<'a> {
    pub(crate) db: &'a Db,
}

impl UsageDb<'_> {
    /// Appended after the message pair is committed (§5 ordering guarantee).
    pub fn append(
        &self,
        conversation_id: Uuid,
        input_tokens: i64,
        cache_creation_tokens: i64,
        cache_read_tokens: i64,
        output_tokens: i64,
        cost_minor_units: i64,
    ) -> Result<()> {
        let mut conn = self.db.conn()?;
        let row = NewTokenUsageRow {
            id: Uuid::new_v4(),
            conversation_id,
            input_tokens,
            cache_creation_tokens,
            cache_read_tokens,
            output_tokens,
            cost_minor_units,
        };
        diesel::insert_into(token_usage_rows::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}
