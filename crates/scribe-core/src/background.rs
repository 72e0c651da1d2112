//! Background job worker. Polls `background_jobs` on an interval and
//! executes due jobs out-of-band, the way the donor's
//! `scheduler::spawn_scheduler` polls `scheduled_tasks` — except here the
//! executor runs conversation-summary generation and staleness refresh
//! rather than delivering chat messages.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::conversation_service::ConversationService;
use crate::db::jobs::{Job, JobType};
use crate::Db;

#[derive(serde::Deserialize)]
struct SummaryJobPayload {
    conversation_id: uuid::Uuid,
}

/// Spawns the poller as a detached tokio task. Failures in individual jobs
/// are logged and recorded on the job row; they never panic the worker.
pub fn spawn_worker(db: Db, conversation_service: Arc<ConversationService>, poll_interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(poll_interval_secs));
        loop {
            interval.tick().await;
            if let Err(e) = run_once(&db, &conversation_service).await {
                error!("background job poll failed: {}", e);
            }
        }
    });
}

async fn run_once(db: &Db, conversation_service: &ConversationService) -> anyhow::Result<()> {
    let due = db.jobs().due(10)?;
    if due.is_empty() {
        return Ok(());
    }
    info!("processing {} due background job(s)", due.len());

    for job in due {
        let result = process_job(db, conversation_service, &job).await;
        match result {
            Ok(()) => {
                db.jobs().mark_done(job.id)?;
            }
            Err(e) => {
                warn!("background job {} ({}) failed: {}", job.id, job.job_type, e);
                db.jobs().mark_failed(job.id, &e.to_string())?;
            }
        }
    }
    Ok(())
}

async fn process_job(
    _db: &Db,
    conversation_service: &ConversationService,
    job: &Job,
) -> anyhow::Result<()> {
    match job.job_type.as_str() {
        t if t == JobType::ConversationSummary.as_str() => {
            let payload: SummaryJobPayload = serde_json::from_value(job.payload.clone())?;
            conversation_service
                .maybe_summarize(payload.conversation_id)
                .await?;
            Ok(())
        }
        t if t == JobType::StalenessRefresh.as_str() => {
            // Staleness-driven artifact refresh (scene summary, outline,
            // character sheets) belongs to the ingestion collaborator
            // (spec.md §1 out-of-scope); this core only enqueues the hint.
            Ok(())
        }
        other => Err(anyhow::anyhow!("unknown job type: {}", other)),
    }
}
