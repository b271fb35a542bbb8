use chrono::Utc;
use tracing::{info, warn};

use crate::core::error::Result;
use crate::storage::connection::Database;
use crate::storage::models::{Job, JobStatus};

/// SQLite-backed durable job queue. Workers claim jobs atomically by
/// flipping `pending -> running` inside a transaction; a crashed worker
/// just leaves its job `running` until `recover_stale_running` resets it.
pub struct JobStore<'a> {
    db: &'a Database,
}

impl<'a> JobStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        JobStore { db }
    }

    pub fn enqueue(&self, job_type: &str, payload: &serde_json::Value, priority: i64) -> Result<i64> {
        let conn = self.db.writer();
        conn.execute(
            "INSERT INTO jobs (job_type, status, payload, priority, created_at, retries)
             VALUES (?1, 'pending', ?2, ?3, ?4, 0)",
            rusqlite::params![job_type, payload.to_string(), priority, Utc::now().to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        info!(job_id = id, job_type, priority, "enqueued job");
        Ok(id)
    }

    /// Claim the oldest, highest-priority pending job (optionally filtered
    /// by `job_type`). The select-then-conditional-update-then-reread
    /// sequence guards against two workers claiming the same row: the
    /// `WHERE status = 'pending'` on the UPDATE makes the second claimer's
    /// update a no-op, and the final re-read confirms who actually won.
    pub fn claim_next(&self, job_type: Option<&str>) -> Result<Option<Job>> {
        let mut conn = self.db.writer();
        let tx = conn.transaction()?;

        let candidate_id: Option<i64> = if let Some(jt) = job_type {
            tx.query_row(
                "SELECT id FROM jobs WHERE status = 'pending' AND job_type = ?1
                 ORDER BY priority ASC, created_at ASC LIMIT 1",
                rusqlite::params![jt],
                |r| r.get(0),
            )
            .ok()
        } else {
            tx.query_row(
                "SELECT id FROM jobs WHERE status = 'pending'
                 ORDER BY priority ASC, created_at ASC LIMIT 1",
                [],
                |r| r.get(0),
            )
            .ok()
        };

        let Some(job_id) = candidate_id else {
            tx.commit()?;
            return Ok(None);
        };

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE jobs SET status = 'running', started_at = ?1 WHERE id = ?2 AND status = 'pending'",
            rusqlite::params![now, job_id],
        )?;

        let job = {
            let mut stmt = tx.prepare("SELECT * FROM jobs WHERE id = ?1")?;
            let mut rows = stmt.query(rusqlite::params![job_id])?;
            let row = rows.next()?.expect("job just claimed must still exist");
            row_to_job(row)?
        };

        tx.commit()?;

        if job.status == JobStatus::Running {
            info!(job_id = job.id, job_type = %job.job_type, "claimed job");
            Ok(Some(job))
        } else {
            Ok(None)
        }
    }

    pub fn complete(&self, job_id: i64) -> Result<()> {
        let conn = self.db.writer();
        conn.execute(
            "UPDATE jobs SET status = 'completed', completed_at = ?1 WHERE id = ?2",
            rusqlite::params![Utc::now().to_rfc3339(), job_id],
        )?;
        info!(job_id, "completed job");
        Ok(())
    }

    pub fn fail(&self, job_id: i64, error: &str) -> Result<()> {
        let conn = self.db.writer();
        conn.execute(
            "UPDATE jobs SET status = 'failed', completed_at = ?1, error = ?2, retries = retries + 1 WHERE id = ?3",
            rusqlite::params![Utc::now().to_rfc3339(), error, job_id],
        )?;
        warn!(job_id, error, "failed job");
        Ok(())
    }

    pub fn retry(&self, job_id: i64) -> Result<()> {
        let conn = self.db.writer();
        conn.execute(
            "UPDATE jobs SET status = 'pending', started_at = NULL, completed_at = NULL, error = NULL WHERE id = ?1",
            rusqlite::params![job_id],
        )?;
        info!(job_id, "re-enqueued job for retry");
        Ok(())
    }

    pub fn get_by_id(&self, job_id: i64) -> Result<Option<Job>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query(rusqlite::params![job_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_job(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_pending_count(&self, job_type: Option<&str>) -> Result<i64> {
        let conn = self.db.reader();
        let n: i64 = match job_type {
            Some(jt) => conn.query_row(
                "SELECT COUNT(*) FROM jobs WHERE status = 'pending' AND job_type = ?1",
                rusqlite::params![jt],
                |r| r.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM jobs WHERE status = 'pending'", [], |r| r.get(0))?,
        };
        Ok(n)
    }

    pub fn get_running(&self) -> Result<Vec<Job>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE status = 'running' ORDER BY started_at")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_job(row)?);
        }
        Ok(out)
    }

    pub fn get_failed(&self, limit: i64) -> Result<Vec<Job>> {
        let conn = self.db.reader();
        let mut stmt =
            conn.prepare("SELECT * FROM jobs WHERE status = 'failed' ORDER BY completed_at DESC LIMIT ?1")?;
        let mut rows = stmt.query(rusqlite::params![limit])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_job(row)?);
        }
        Ok(out)
    }

    /// Delete completed jobs beyond the most recent `keep_last`, so the
    /// table doesn't grow unbounded.
    pub fn cleanup_completed(&self, keep_last: i64) -> Result<usize> {
        let conn = self.db.writer();
        let count = conn.execute(
            "DELETE FROM jobs WHERE status = 'completed' AND id NOT IN (
                SELECT id FROM jobs WHERE status = 'completed' ORDER BY completed_at DESC LIMIT ?1
            )",
            rusqlite::params![keep_last],
        )?;
        if count > 0 {
            info!(count, "cleaned up old completed jobs");
        }
        Ok(count)
    }

    /// Reset jobs stuck `running` longer than `max_age_secs` back to
    /// `pending`, for the case where a worker died without completing.
    pub fn recover_stale_running(&self, max_age_secs: i64) -> Result<usize> {
        let conn = self.db.writer();
        let cutoff = Utc::now() - chrono::Duration::seconds(max_age_secs);
        let count = conn.execute(
            "UPDATE jobs SET status = 'pending', started_at = NULL
             WHERE status = 'running' AND started_at < ?1",
            rusqlite::params![cutoff.to_rfc3339()],
        )?;
        if count > 0 {
            warn!(count, "recovered stale running jobs");
        }
        Ok(count)
    }
}

fn row_to_job(row: &rusqlite::Row) -> Result<Job> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let started_at: Option<String> = row.get("started_at")?;
    let completed_at: Option<String> = row.get("completed_at")?;
    Ok(Job {
        id: row.get("id")?,
        job_type: row.get("job_type")?,
        status: JobStatus::parse(&status),
        payload: row.get("payload")?,
        priority: row.get("priority")?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        started_at: started_at.and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&chrono::Utc)),
        completed_at: completed_at.and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&chrono::Utc)),
        error: row.get("error")?,
        retries: row.get("retries")?,
    })
}
