//! Database layer. One `Db` handle wraps a pooled connection and exposes a
//! small per-concern accessor for each table group, mirroring the donor's
//! `MemoryDb::blocks()`/`MemoryDb::messages()` shape — except the shared
//! resource here is a `r2d2::Pool` rather than a single `Arc<Mutex<PgConnection>>`,
//! since the core must serve concurrent requests (§5).

pub mod conversations;
pub mod embeddings;
pub mod jobs;
pub mod messages;
pub mod outline;
pub mod scripts;
pub mod summaries;
pub mod threads;
pub mod usage;
pub mod working_set;

use anyhow::{Context, Result};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Shared handle to the connection pool, cloned cheaply into each
/// request-scoped collaborator (router, retrieval service, conversation
/// service, tool executor) per spec §9's "no hidden singletons" note.
#[derive(Clone)]
pub struct Db {
    pool: DbPool,
}

impl Db {
    pub fn connect(database_url: &str) -> Result<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .build(manager)
            .context("failed to build database connection pool")?;
        Ok(Self { pool })
    }

    pub fn conn(&self) -> Result<DbConn> {
        self.pool.get().context("failed to acquire pooled connection")
    }

    pub fn scripts(&self) -> scripts::ScriptsDb<'_> {
        scripts::ScriptsDb { db: self }
    }

    pub fn embeddings(&self) -> embeddings::EmbeddingsDb<'_> {
        embeddings::EmbeddingsDb { db: self }
    }

    pub fn outline(&self) -> outline::OutlineDb<'_> {
        outline::OutlineDb { db: self }
    }

    pub fn threads(&self) -> threads::ThreadsDb<'_> {
        threads::ThreadsDb { db: self }
    }

    pub fn conversations(&self) -> conversations::ConversationsDb<'_> {
        conversations::ConversationsDb { db: self }
    }

    pub fn messages(&self) -> messages::MessagesDb<'_> {
        messages::MessagesDb { db: self }
    }

    pub fn summaries(&self) -> summaries::SummariesDb<'_> {
        summaries::SummariesDb { db: self }
    }

    pub fn working_set(&self) -> working_set::WorkingSetDb<'_> {
        working_set::WorkingSetDb { db: self }
    }

    pub fn usage(&self) -> usage::UsageDb<'_> {
        usage::UsageDb { db: self }
    }

    pub fn jobs(&self) -> jobs::JobsDb<'_> {
        jobs::JobsDb { db: self }
    }
}
