use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::core::error::Result;

const SCHEMA_VERSION: i64 = 1;

const RAW_POSTS_DDL: &str = "
CREATE TABLE IF NOT EXISTS raw_posts (
    id              TEXT PRIMARY KEY,
    subreddit       TEXT NOT NULL,
    permalink       TEXT UNIQUE NOT NULL,
    title           TEXT NOT NULL,
    body            TEXT,
    author          TEXT,
    score           INTEGER DEFAULT 0,
    comment_count   INTEGER DEFAULT 0,
    created_utc     INTEGER DEFAULT 0,
    crawled_at      TEXT NOT NULL,
    raw_html        BLOB,
    post_type       TEXT DEFAULT 'self'
);";

const RAW_POSTS_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_raw_posts_subreddit ON raw_posts(subreddit);",
    "CREATE INDEX IF NOT EXISTS idx_raw_posts_created_utc ON raw_posts(created_utc);",
    "CREATE INDEX IF NOT EXISTS idx_raw_posts_crawled_at ON raw_posts(crawled_at);",
];

const PROCESSED_POSTS_DDL: &str = "
CREATE TABLE IF NOT EXISTS processed_posts (
    id                TEXT PRIMARY KEY,
    title_tokens      TEXT DEFAULT '[]',
    body_tokens       TEXT DEFAULT '[]',
    all_tokens        TEXT DEFAULT '[]',
    token_count       INTEGER DEFAULT 0,
    pipeline_version  INTEGER DEFAULT 1,
    processed_at      TEXT NOT NULL,
    FOREIGN KEY (id) REFERENCES raw_posts(id) ON DELETE CASCADE
);";

const PROCESSED_POSTS_INDEXES: &[&str] =
    &["CREATE INDEX IF NOT EXISTS idx_processed_posts_version ON processed_posts(pipeline_version);"];

const INDEX_VERSIONS_DDL: &str = "
CREATE TABLE IF NOT EXISTS index_versions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    index_type  TEXT NOT NULL,
    shard_id    TEXT NOT NULL,
    version     INTEGER NOT NULL,
    status      TEXT DEFAULT 'building',
    doc_count   INTEGER DEFAULT 0,
    file_path   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);";

const INDEX_VERSIONS_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_index_versions_shard_type ON index_versions(shard_id, index_type);",
    "CREATE INDEX IF NOT EXISTS idx_index_versions_status ON index_versions(status);",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_index_versions_active ON index_versions(index_type, shard_id) WHERE status = 'active';",
];

const JOBS_DDL: &str = "
CREATE TABLE IF NOT EXISTS jobs (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    job_type        TEXT NOT NULL,
    status          TEXT DEFAULT 'pending',
    payload         TEXT DEFAULT '{}',
    priority        INTEGER DEFAULT 10,
    created_at      TEXT NOT NULL,
    started_at      TEXT,
    completed_at    TEXT,
    error           TEXT,
    retries         INTEGER DEFAULT 0
);";

const JOBS_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_jobs_dequeue ON jobs(status, priority, created_at);",
    "CREATE INDEX IF NOT EXISTS idx_jobs_type ON jobs(job_type);",
];

const SHARD_ASSIGNMENTS_DDL: &str = "
CREATE TABLE IF NOT EXISTS shard_assignments (
    subreddit  TEXT PRIMARY KEY,
    shard_id   TEXT NOT NULL
);";

fn apply_pragmas(conn: &Connection, busy_timeout_ms: u32) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", busy_timeout_ms)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(RAW_POSTS_DDL)?;
    conn.execute_batch(PROCESSED_POSTS_DDL)?;
    conn.execute_batch(INDEX_VERSIONS_DDL)?;
    conn.execute_batch(JOBS_DDL)?;
    conn.execute_batch(SHARD_ASSIGNMENTS_DDL)?;

    for sql in RAW_POSTS_INDEXES
        .iter()
        .chain(PROCESSED_POSTS_INDEXES)
        .chain(INDEX_VERSIONS_INDEXES)
        .chain(JOBS_INDEXES)
    {
        conn.execute_batch(sql)?;
    }

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Owns the single writer connection and a small pool of reader
/// connections. Matches the "one writer behind a mutex, many pooled
/// readers" shape the relational store is required to provide: SQLite's
/// WAL journal mode lets readers proceed without blocking on the writer.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path, busy_timeout_ms: u32, reader_pool_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let writer = Connection::open(path)?;
        apply_pragmas(&writer, busy_timeout_ms)?;
        initialize_schema(&writer)?;

        let mut readers = Vec::with_capacity(reader_pool_size.max(1));
        for _ in 0..reader_pool_size.max(1) {
            let reader = Connection::open(path)?;
            apply_pragmas(&reader, busy_timeout_ms)?;
            readers.push(Mutex::new(reader));
        }

        Ok(Database {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// In-memory database, used by tests that don't want filesystem state.
    pub fn open_in_memory() -> Result<Self> {
        let writer = Connection::open_in_memory()?;
        apply_pragmas(&writer, 5_000).ok();
        initialize_schema(&writer)?;
        Ok(Database {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        })
    }

    pub fn writer(&self) -> parking_lot::MutexGuard<'_, Connection> {
        self.writer.lock()
    }

    /// Borrow a pooled reader, round-robin. Falls back to the writer
    /// connection when no reader pool was configured (e.g. in-memory tests).
    pub fn reader(&self) -> parking_lot::MutexGuard<'_, Connection> {
        if self.readers.is_empty() {
            return self.writer.lock();
        }
        let idx = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        self.readers[idx].lock()
    }
}
