use chrono::Utc;
use tracing::info;

use crate::core::error::Result;
use crate::storage::connection::Database;
use crate::storage::models::{IndexVersion, IndexVersionStatus};

/// Tracks built index files and their statuses, enabling zero-downtime
/// swaps: build a new version, atomically flip the active pointer, then
/// the old version becomes a cleanup candidate.
pub struct IndexVersionStore<'a> {
    db: &'a Database,
}

impl<'a> IndexVersionStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        IndexVersionStore { db }
    }

    pub fn insert(
        &self,
        index_type: &str,
        shard_id: &str,
        version: i64,
        status: IndexVersionStatus,
        doc_count: i64,
        file_path: &str,
    ) -> Result<i64> {
        let conn = self.db.writer();
        conn.execute(
            "INSERT INTO index_versions
                (index_type, shard_id, version, status, doc_count, file_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                index_type,
                shard_id,
                version,
                status.as_str(),
                doc_count,
                file_path,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(shard_id, index_type, version, status = status.as_str(), "created index version");
        Ok(id)
    }

    pub fn get_active(&self, index_type: &str, shard_id: &str) -> Result<Option<IndexVersion>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare(
            "SELECT * FROM index_versions WHERE index_type = ?1 AND shard_id = ?2 AND status = 'active'",
        )?;
        let mut rows = stmt.query(rusqlite::params![index_type, shard_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_version(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_latest_version_number(&self, index_type: &str, shard_id: &str) -> Result<i64> {
        let conn = self.db.reader();
        let v: Option<i64> = conn.query_row(
            "SELECT MAX(version) FROM index_versions WHERE index_type = ?1 AND shard_id = ?2",
            rusqlite::params![index_type, shard_id],
            |r| r.get(0),
        )?;
        Ok(v.unwrap_or(0))
    }

    /// Atomically mark the current active row stale and flip the given
    /// version to active. Must be one transaction: there must never be a
    /// committed state with zero active rows for a (type, shard) that has
    /// at least one version.
    pub fn activate(&self, index_type: &str, shard_id: &str, version: i64) -> Result<()> {
        let mut conn = self.db.writer();
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE index_versions SET status = 'stale' WHERE index_type = ?1 AND shard_id = ?2 AND status = 'active'",
            rusqlite::params![index_type, shard_id],
        )?;
        tx.execute(
            "UPDATE index_versions SET status = 'active' WHERE index_type = ?1 AND shard_id = ?2 AND version = ?3",
            rusqlite::params![index_type, shard_id, version],
        )?;
        tx.commit()?;
        info!(shard_id, index_type, version, "activated index");
        Ok(())
    }

    pub fn get_stale(&self) -> Result<Vec<IndexVersion>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare("SELECT * FROM index_versions WHERE status = 'stale'")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_version(row)?);
        }
        Ok(out)
    }

    pub fn delete(&self, version_id: i64) -> Result<()> {
        let conn = self.db.writer();
        conn.execute("DELETE FROM index_versions WHERE id = ?1", rusqlite::params![version_id])?;
        Ok(())
    }

    pub fn get_all_active(&self) -> Result<Vec<IndexVersion>> {
        let conn = self.db.reader();
        let mut stmt = conn.prepare(
            "SELECT * FROM index_versions WHERE status = 'active' ORDER BY shard_id, index_type",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_version(row)?);
        }
        Ok(out)
    }
}

fn row_to_version(row: &rusqlite::Row) -> Result<IndexVersion> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    Ok(IndexVersion {
        id: row.get("id")?,
        index_type: row.get("index_type")?,
        shard_id: row.get("shard_id")?,
        version: row.get("version")?,
        status: IndexVersionStatus::parse(&status),
        doc_count: row.get("doc_count")?,
        file_path: row.get("file_path")?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
    })
}
