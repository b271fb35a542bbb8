use crate::core::error::Result;
use crate::storage::connection::Database;
use crate::storage::models::ShardAssignment;

/// Persists the shard plan computed by `sharding::planner::ShardPlanner`.
pub struct ShardAssignmentStore<'a> {
    db: &'a Database,
}

impl<'a> ShardAssignmentStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        ShardAssignmentStore { db }
    }

    pub fn upsert(&self, subreddit: &str, shard_id: &str) -> Result<()> {
        let conn = self.db.writer();
        conn.execute(
            "INSERT OR REPLACE INTO shard_assignments (subreddit, shard_id) VALUES (?1, ?2)",
            rusqlite::params![subreddit.to_lowercase(), shard_id],
        )?;
        Ok(())
    }

    pub fn upsert_many(&self, assignments: &[ShardAssignment]) -> Result<()> {
        let mut conn = self.db.writer();
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT OR REPLACE INTO shard_assignments (subreddit, shard_id) VALUES (?1, ?2)")?;
            for a in assignments {
                stmt.execute(rusqlite::params![a.subreddit.to_lowercase(), a.shard_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get(&self, subreddit: &str) -> Result<Option<String>> {
        let conn = self.db.reader();
        let shard: Option<String> = conn
            .query_row(
                "SELECT shard_id FROM shard_assignments WHERE subreddit = ?1",
                rusqlite::params![subreddit.to_lowercase()],
                |r| r.get(0),
            )
            .ok();
        Ok(shard)
    }

    pub fn get_all(&self) -> Result<Vec<ShardAssignment>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare("SELECT subreddit, shard_id FROM shard_assignments")?;
        let rows = stmt.query_map([], |r| {
            Ok(ShardAssignment {
                subreddit: r.get(0)?,
                shard_id: r.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Distinct shard ids currently used for a given index type, derived
    /// from `index_versions` rather than the plan itself — used by the
    /// router's "all subreddits" fan-out.
    pub fn distinct_shard_ids(&self, index_type: &str) -> Result<Vec<String>> {
        let conn = self.db.reader();
        let mut stmt =
            conn.prepare("SELECT DISTINCT shard_id FROM index_versions WHERE index_type = ?1 AND status = 'active'")?;
        let rows = stmt.query_map(rusqlite::params![index_type], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}
