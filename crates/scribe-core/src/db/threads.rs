//! Read-only access to PlotThread and SceneRelationship.

use anyhow::Result;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{plot_threads, scene_relationships};
use crate::Db;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = plot_threads)]
pub struct PlotThread {
    pub id: Uuid,
    pub script_id: Uuid,
    pub name: String,
    pub thread_type: String,
    pub scene_positions: Vec<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = scene_relationships)]
pub struct SceneRelationship {
    pub id: Uuid,
    pub script_id: Uuid,
    pub setup_position: i32,
    pub payoff_position: i32,
    pub relationship_type: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct ThreadsDb<'a> {
    pub(crate) db: &'a Db,
}

impl ThreadsDb<'_> {
    pub fn list_plot_threads(
        &self,
        script_id: Uuid,
        thread_type: Option<&str>,
    ) -> Result<Vec<PlotThread>> {
        let mut conn = self.db.conn()?;
        let mut query = plot_threads::table
            .filter(plot_threads::script_id.eq(script_id))
            .into_boxed();
        if let Some(t) = thread_type {
            query = query.filter(plot_threads::thread_type.eq(t.to_string()));
        }
        Ok(query.select(PlotThread::as_select()).load(&mut conn)?)
    }

    pub fn list_scene_relationships(
        &self,
        script_id: Uuid,
        relationship_type: Option<&str>,
    ) -> Result<Vec<SceneRelationship>> {
        let mut conn = self.db.conn()?;
        let mut query = scene_relationships::table
            .filter(scene_relationships::script_id.eq(script_id))
            .into_boxed();
        if let Some(t) = relationship_type {
            query = query.filter(scene_relationships::relationship_type.eq(t.to_string()));
        }
        Ok(query
            .select(SceneRelationship::as_select())
            .order(scene_relationships::setup_position.asc())
            .load(&mut conn)?)
    }
}
