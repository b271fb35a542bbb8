use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::core::config::JobSettings;
use crate::core::error::Result;
use crate::storage::connection::Database;
use crate::storage::job_store::JobStore;

/// A job handler receives the job's decoded JSON payload and either
/// succeeds or returns an error describing what went wrong.
pub type JobHandler = Arc<dyn Fn(&serde_json::Value) -> Result<()> + Send + Sync>;

/// Single poll-claim-dispatch loop over the durable job queue. A crashed
/// worker just leaves its claimed job `running`; `JobStore::recover_stale_running`
/// is what gets it back to `pending`, not this type.
pub struct Worker {
    db: Arc<Database>,
    handlers: HashMap<String, JobHandler>,
    settings: JobSettings,
    name: String,
}

impl Worker {
    pub fn new(db: Arc<Database>, handlers: HashMap<String, JobHandler>, settings: JobSettings, name: String) -> Self {
        Worker { db, handlers, settings, name }
    }

    /// Run until `running` is flipped false, sleeping `poll_interval_ms`
    /// between ticks that find no pending work.
    pub fn run_loop(&self, running: Arc<AtomicBool>) {
        info!(worker = %self.name, "worker started");
        while running.load(Ordering::Relaxed) {
            match self.tick() {
                Ok(Some(_)) => {}
                Ok(None) => std::thread::sleep(Duration::from_millis(self.settings.poll_interval_ms)),
                Err(e) => {
                    error!(worker = %self.name, error = %e, "worker tick failed");
                    std::thread::sleep(Duration::from_millis(self.settings.poll_interval_ms));
                }
            }
        }
        info!(worker = %self.name, "worker stopped");
    }

    /// Claim and execute exactly one job, synchronously. Returns the
    /// claimed job's id, or `None` if the queue was empty.
    pub fn run_once(&self) -> Result<Option<i64>> {
        self.tick()
    }

    fn tick(&self) -> Result<Option<i64>> {
        let store = JobStore::new(&self.db);
        let Some(job) = store.claim_next(None)? else {
            return Ok(None);
        };

        let Some(handler) = self.handlers.get(&job.job_type) else {
            store.fail(job.id, &format!("no handler registered for '{}'", job.job_type))?;
            error!(worker = %self.name, job_id = job.id, job_type = %job.job_type, "no handler for job type");
            return Ok(Some(job.id));
        };

        let payload = job.payload_json()?;
        info!(worker = %self.name, job_id = job.id, job_type = %job.job_type, "executing job");

        match handler(&payload) {
            Ok(()) => {
                store.complete(job.id)?;
            }
            Err(e) => {
                store.fail(job.id, &e.to_string())?;
                error!(worker = %self.name, job_id = job.id, error = %e, "job failed");

                if let Some(updated) = store.get_by_id(job.id)? {
                    if updated.retries < self.settings.max_retries as i64 {
                        store.retry(job.id)?;
                        info!(worker = %self.name, job_id = job.id, retries = updated.retries, "job re-enqueued");
                    }
                }
            }
        }

        Ok(Some(job.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn settings() -> JobSettings {
        JobSettings { worker_count: 1, poll_interval_ms: 10, stale_age_secs: 900, max_retries: 3, completed_retention_secs: 604800 }
    }

    #[test]
    fn run_once_dispatches_registered_handler() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        JobStore::new(&db).enqueue("ping", &serde_json::json!({}), 10).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let mut handlers: HashMap<String, JobHandler> = HashMap::new();
        handlers.insert(
            "ping".to_string(),
            Arc::new(move |_payload: &serde_json::Value| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let worker = Worker::new(db.clone(), handlers, settings(), "worker-0".to_string());
        let job_id = worker.run_once().unwrap();
        assert!(job_id.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_job_type_fails_immediately() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        JobStore::new(&db).enqueue("mystery", &serde_json::json!({}), 10).unwrap();

        let worker = Worker::new(db.clone(), HashMap::new(), settings(), "worker-0".to_string());
        let job_id = worker.run_once().unwrap().unwrap();

        let job = JobStore::new(&db).get_by_id(job_id).unwrap().unwrap();
        assert_eq!(job.status, crate::storage::models::JobStatus::Failed);
    }

    #[test]
    fn failing_handler_retries_under_the_limit() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        JobStore::new(&db).enqueue("flaky", &serde_json::json!({}), 10).unwrap();

        let mut handlers: HashMap<String, JobHandler> = HashMap::new();
        handlers.insert("flaky".to_string(), Arc::new(|_: &serde_json::Value| Err(crate::core::error::Error::Internal("boom".to_string()))));

        let worker = Worker::new(db.clone(), handlers, settings(), "worker-0".to_string());
        let job_id = worker.run_once().unwrap().unwrap();

        let job = JobStore::new(&db).get_by_id(job_id).unwrap().unwrap();
        assert_eq!(job.status, crate::storage::models::JobStatus::Pending);
        assert_eq!(job.retries, 1);
    }
}
