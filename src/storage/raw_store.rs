use chrono::Utc;
use rusqlite::params_from_iter;
use tracing::debug;

use crate::core::error::Result;
use crate::storage::connection::Database;
use crate::storage::models::{parse_post_type, RawPost};

/// Write-once store for crawled posts: once a row exists it is never
/// mutated, only re-read. Dedup is by primary key (`INSERT OR IGNORE`).
pub struct RawPostStore<'a> {
    db: &'a Database,
}

impl<'a> RawPostStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        RawPostStore { db }
    }

    pub fn insert(&self, post: &RawPost) -> Result<bool> {
        let conn = self.db.writer();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO raw_posts
                (id, subreddit, permalink, title, body, author, score,
                 comment_count, created_utc, crawled_at, raw_html, post_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                post.id,
                post.subreddit,
                post.permalink,
                post.title,
                post.body,
                post.author,
                post.score,
                post.comment_count,
                post.created_utc,
                post.crawled_at.to_rfc3339(),
                post.raw_html,
                post.post_type_str(),
            ],
        )?;
        if changed > 0 {
            debug!(post_id = %post.id, "inserted raw post");
        }
        Ok(changed > 0)
    }

    pub fn insert_many(&self, posts: &[RawPost]) -> Result<usize> {
        let mut conn = self.db.writer();
        let tx = conn.transaction()?;
        let mut count = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO raw_posts
                    (id, subreddit, permalink, title, body, author, score,
                     comment_count, created_utc, crawled_at, raw_html, post_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for post in posts {
                let changed = stmt.execute(rusqlite::params![
                    post.id,
                    post.subreddit,
                    post.permalink,
                    post.title,
                    post.body,
                    post.author,
                    post.score,
                    post.comment_count,
                    post.created_utc,
                    post.crawled_at.to_rfc3339(),
                    post.raw_html,
                    post.post_type_str(),
                ])?;
                count += changed;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn get_by_id(&self, post_id: &str) -> Result<Option<RawPost>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare("SELECT * FROM raw_posts WHERE id = ?1")?;
        let mut rows = stmt.query(rusqlite::params![post_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_post(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_by_ids(&self, post_ids: &[String]) -> Result<Vec<RawPost>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.db.reader();
        let placeholders = post_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!("SELECT * FROM raw_posts WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(post_ids.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_post(row)?);
        }
        Ok(out)
    }

    pub fn get_by_subreddit(&self, subreddit: &str, limit: i64, offset: i64) -> Result<Vec<RawPost>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare(
            "SELECT * FROM raw_posts WHERE subreddit = ?1 ORDER BY created_utc DESC LIMIT ?2 OFFSET ?3",
        )?;
        let mut rows = stmt.query(rusqlite::params![subreddit.to_lowercase(), limit, offset])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_post(row)?);
        }
        Ok(out)
    }

    pub fn exists(&self, post_id: &str) -> Result<bool> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare("SELECT 1 FROM raw_posts WHERE id = ?1")?;
        Ok(stmt.exists(rusqlite::params![post_id])?)
    }

    pub fn count(&self, subreddit: Option<&str>) -> Result<i64> {
        let conn = self.db.reader();
        let n: i64 = match subreddit {
            Some(sub) => conn.query_row(
                "SELECT COUNT(*) FROM raw_posts WHERE subreddit = ?1",
                rusqlite::params![sub.to_lowercase()],
                |r| r.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM raw_posts", [], |r| r.get(0))?,
        };
        Ok(n)
    }

    pub fn get_subreddits(&self) -> Result<Vec<String>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare("SELECT DISTINCT subreddit FROM raw_posts ORDER BY subreddit")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Posts with no `processed_posts` row, or one older than `current_version`.
    /// Drives incremental preprocessing.
    pub fn get_unprocessed_ids(&self, current_version: i64) -> Result<Vec<String>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare(
            "SELECT r.id FROM raw_posts r
             LEFT JOIN processed_posts p ON r.id = p.id
             WHERE p.id IS NULL OR p.pipeline_version < ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![current_version], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

fn row_to_post(row: &rusqlite::Row) -> Result<RawPost> {
    let post_type_str: String = row.get("post_type")?;
    let crawled_at_str: String = row.get("crawled_at")?;
    Ok(RawPost {
        id: row.get("id")?,
        subreddit: row.get("subreddit")?,
        permalink: row.get("permalink")?,
        title: row.get("title")?,
        body: row.get("body")?,
        author: row.get("author")?,
        score: row.get("score")?,
        comment_count: row.get("comment_count")?,
        created_utc: row.get("created_utc")?,
        crawled_at: chrono::DateTime::parse_from_rfc3339(&crawled_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        raw_html: row.get("raw_html")?,
        post_type: parse_post_type(&post_type_str),
    })
}
