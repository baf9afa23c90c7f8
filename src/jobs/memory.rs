use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Job, JobDispatcher};
use crate::error::{AppError, AppResult};

/// Collects jobs in memory. Used by tests and by local runs without Redis.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobDispatcher {
    jobs: Arc<Mutex<Vec<Job>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryJobDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose transport is down: every enqueue fails with `QueueError`.
    pub fn failing() -> Self {
        let dispatcher = Self::default();
        dispatcher.set_failing(true);
        dispatcher
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of accepted jobs, oldest first.
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs
            .lock()
            .map(|jobs| jobs.clone())
            .unwrap_or_default()
    }

    pub fn jobs_of_type(&self, event_type: &str) -> Vec<Job> {
        self.jobs()
            .into_iter()
            .filter(|job| job.event_type == event_type)
            .collect()
    }
}

#[async_trait]
impl JobDispatcher for InMemoryJobDispatcher {
    async fn enqueue(&self, event_type: &str, payload: serde_json::Value) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::QueueError("in-memory queue unavailable".into()));
        }
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|e| AppError::QueueError(format!("in-memory queue poisoned: {}", e)))?;
        jobs.push(Job::new(event_type, payload));
        Ok(())
    }
}
