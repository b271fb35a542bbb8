use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use crate::core::config::JobSettings;
use crate::core::error::Result;
use crate::jobs::worker::{JobHandler, Worker};
use crate::storage::connection::Database;
use crate::storage::job_store::JobStore;

/// Owns a pool of `Worker` threads sharing one handler registry and job
/// store, plus convenience enqueue helpers for the job types this crate
/// knows about.
pub struct WorkerPool {
    db: Arc<Database>,
    settings: JobSettings,
    handlers: HashMap<String, JobHandler>,
    threads: Vec<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(db: Arc<Database>, settings: JobSettings) -> Self {
        WorkerPool { db, settings, handlers: HashMap::new(), threads: Vec::new(), running: Arc::new(AtomicBool::new(false)) }
    }

    pub fn register(&mut self, job_type: &str, handler: JobHandler) {
        self.handlers.insert(job_type.to_string(), handler);
    }

    pub fn start(&mut self) {
        if !self.threads.is_empty() {
            warn!("worker pool already running, ignoring start()");
            return;
        }

        self.running.store(true, Ordering::Relaxed);
        for i in 0..self.settings.worker_count {
            let worker = Worker::new(self.db.clone(), self.handlers.clone(), self.settings.clone(), format!("worker-{i}"));
            let running = self.running.clone();
            self.threads.push(std::thread::spawn(move || worker.run_loop(running)));
        }
        info!(worker_count = self.threads.len(), "worker pool started");
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        info!("worker pool stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.threads.is_empty() && self.running.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.threads.len()
    }

    pub fn enqueue_crawl(&self, subreddit: &str, max_pages: i64, priority: i64) -> Result<i64> {
        JobStore::new(&self.db).enqueue("crawl", &json!({"subreddit": subreddit, "max_pages": max_pages}), priority)
    }

    pub fn enqueue_preprocess(&self, subreddit: Option<&str>, priority: i64) -> Result<i64> {
        JobStore::new(&self.db)
            .enqueue("preprocess", &json!({"subreddit": subreddit.unwrap_or("all")}), priority)
    }

    pub fn enqueue_build_index(&self, index_type: &str, subreddit: Option<&str>, priority: i64) -> Result<i64> {
        JobStore::new(&self.db).enqueue(
            "build_index",
            &json!({"index_type": index_type, "subreddit": subreddit.unwrap_or("all")}),
            priority,
        )
    }

    pub fn enqueue_rebuild(&self, priority: i64) -> Result<i64> {
        JobStore::new(&self.db).enqueue("rebuild", &json!({}), priority)
    }

    pub fn recover_stale(&self, max_age_secs: i64) -> Result<usize> {
        JobStore::new(&self.db).recover_stale_running(max_age_secs)
    }

    pub fn cleanup(&self, keep_last: i64) -> Result<usize> {
        JobStore::new(&self.db).cleanup_completed(keep_last)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn settings() -> JobSettings {
        JobSettings { worker_count: 2, poll_interval_ms: 10, stale_age_secs: 900, max_retries: 3, completed_retention_secs: 604800 }
    }

    #[test]
    fn start_spawns_configured_worker_count_and_stop_joins_them() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let mut pool = WorkerPool::new(db, settings());
        pool.start();
        assert_eq!(pool.worker_count(), 2);
        assert!(pool.is_running());
        pool.stop();
        assert_eq!(pool.worker_count(), 0);
    }

    #[test]
    fn registered_handler_processes_enqueued_job() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let mut pool = WorkerPool::new(db, settings());

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        pool.register(
            "crawl",
            Arc::new(move |_payload: &serde_json::Value| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        pool.enqueue_crawl("rust", 5, 10).unwrap();
        pool.start();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while calls.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        pool.stop();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
