use chrono::Utc;

use crate::core::error::Result;
use crate::storage::connection::Database;
use crate::storage::models::ProcessedPost;

/// Derived, disposable store: rows here are rebuilt wholesale whenever the
/// preprocessing pipeline version changes.
pub struct ProcessedPostStore<'a> {
    db: &'a Database,
}

impl<'a> ProcessedPostStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        ProcessedPostStore { db }
    }

    pub fn upsert(&self, post: &ProcessedPost) -> Result<()> {
        let conn = self.db.writer();
        conn.execute(
            "INSERT OR REPLACE INTO processed_posts
                (id, title_tokens, body_tokens, all_tokens, token_count, pipeline_version, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                post.id,
                serde_json::to_string(&post.title_tokens)?,
                serde_json::to_string(&post.body_tokens)?,
                serde_json::to_string(&post.all_tokens)?,
                post.token_count as i64,
                post.pipeline_version,
                post.processed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn upsert_many(&self, posts: &[ProcessedPost]) -> Result<usize> {
        let mut conn = self.db.writer();
        let tx = conn.transaction()?;
        let mut count = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO processed_posts
                    (id, title_tokens, body_tokens, all_tokens, token_count, pipeline_version, processed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for post in posts {
                stmt.execute(rusqlite::params![
                    post.id,
                    serde_json::to_string(&post.title_tokens)?,
                    serde_json::to_string(&post.body_tokens)?,
                    serde_json::to_string(&post.all_tokens)?,
                    post.token_count as i64,
                    post.pipeline_version,
                    post.processed_at.to_rfc3339(),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn get_by_id(&self, post_id: &str) -> Result<Option<ProcessedPost>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare("SELECT * FROM processed_posts WHERE id = ?1")?;
        let mut rows = stmt.query(rusqlite::params![post_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_post(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_by_ids(&self, post_ids: &[String]) -> Result<Vec<ProcessedPost>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.db.reader();
        let placeholders = post_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!("SELECT * FROM processed_posts WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(post_ids.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_post(row)?);
        }
        Ok(out)
    }

    pub fn get_all_for_subreddit(&self, subreddit: &str) -> Result<Vec<ProcessedPost>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare(
            "SELECT p.* FROM processed_posts p
             JOIN raw_posts r ON p.id = r.id
             WHERE r.subreddit = ?1
             ORDER BY r.created_utc DESC",
        )?;
        let mut rows = stmt.query(rusqlite::params![subreddit.to_lowercase()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_post(row)?);
        }
        Ok(out)
    }

    pub fn count(&self, pipeline_version: Option<i64>) -> Result<i64> {
        let conn = self.db.reader();
        let n: i64 = match pipeline_version {
            Some(v) => conn.query_row(
                "SELECT COUNT(*) FROM processed_posts WHERE pipeline_version = ?1",
                rusqlite::params![v],
                |r| r.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM processed_posts", [], |r| r.get(0))?,
        };
        Ok(n)
    }

    pub fn delete_all(&self) -> Result<usize> {
        let conn = self.db.writer();
        Ok(conn.execute("DELETE FROM processed_posts", [])?)
    }
}

fn row_to_post(row: &rusqlite::Row) -> Result<ProcessedPost> {
    let title_tokens: String = row.get("title_tokens")?;
    let body_tokens: String = row.get("body_tokens")?;
    let all_tokens: String = row.get("all_tokens")?;
    let processed_at_str: String = row.get("processed_at")?;
    Ok(ProcessedPost {
        id: row.get("id")?,
        title_tokens: serde_json::from_str(&title_tokens)?,
        body_tokens: serde_json::from_str(&body_tokens)?,
        all_tokens: serde_json::from_str(&all_tokens)?,
        token_count: row.get::<_, i64>("token_count")? as usize,
        pipeline_version: row.get("pipeline_version")?,
        processed_at: chrono::DateTime::parse_from_rfc3339(&processed_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
