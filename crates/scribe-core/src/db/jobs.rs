//! Background job queue (§6 "Background job collaborator", §9 "use an
//! external queue with a deduplicating job id rather than in-process
//! background tasks"). Grounded on the donor's `scheduler.rs::SchedulerDb`
//! shape, retargeted from Signal-message tasks to conversation-summary and
//! staleness-refresh jobs, and backed by a `dedup_key` unique constraint
//! instead of the donor's cron-driven recurrence.

use anyhow::Result;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::background_jobs;
use crate::Db;

#[derive(Debug, Clone, PartialEq)]
pub enum JobType {
    ConversationSummary,
    StalenessRefresh,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::ConversationSummary => "conversation_summary",
            JobType::StalenessRefresh => "staleness_refresh",
        }
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = background_jobs)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub dedup_key: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = background_jobs)]
struct NewJob {
    id: Uuid,
    job_type: String,
    dedup_key: String,
    payload: serde_json::Value,
}

pub struct JobsDb<'a> {
    pub(crate) db: &'a Db,
}

impl JobsDb<'_> {
    /// Enqueue a job identified by `dedup_key`; a second enqueue for the
    /// same key while one is still pending is a no-op (the core "never
    /// blocks on them" and never double-schedules them, §6/§9).
    pub fn enqueue(&self, job_type: JobType, dedup_key: &str, payload: serde_json::Value) -> Result<()> {
        let mut conn = self.db.conn()?;
        let row = NewJob {
            id: Uuid::new_v4(),
            job_type: job_type.as_str().to_string(),
            dedup_key: dedup_key.to_string(),
            payload,
        };
        diesel::insert_into(background_jobs::table)
            .values(&row)
            .on_conflict(background_jobs::dedup_key)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn due(&self, limit: i64) -> Result<Vec<Job>> {
        let mut conn = self.db.conn()?;
        Ok(background_jobs::table
            .filter(background_jobs::status.eq("pending"))
            .filter(background_jobs::run_at.le(Utc::now()))
            .order(background_jobs::run_at.asc())
            .limit(limit)
            .select(Job::as_select())
            .load(&mut conn)?)
    }

    pub fn mark_done(&self, id: Uuid) -> Result<()> {
        let mut conn = self.db.conn()?;
        diesel::update(background_jobs::table.filter(background_jobs::id.eq(id)))
            .set(background_jobs::status.eq("completed"))
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn mark_failed(&self, id: Uuid, error: &str) -> Result<()> {
        let mut conn = self.db.conn()?;
        diesel::update(background_jobs::table.filter(background_jobs::id.eq(id)))
            .set((
                background_jobs::status.eq("failed"),
                background_jobs::last_error.eq(Some(error.to_string())),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}
