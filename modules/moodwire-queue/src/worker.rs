use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{Job, JobQueue, Result};

/// Handler for one lane. Implementations must tolerate redelivery of the
/// same job (the store's upsert contract and the monitored-scope guard make
/// the built-in handlers idempotent).
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job) -> anyhow::Result<()>;
}

/// Pulls jobs from registered lanes with bounded concurrency. A handler
/// error releases the job for redelivery; a handler success deletes it.
pub struct Worker {
    queue: JobQueue,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    concurrency: usize,
    worker_id: String,
    /// Sleep between polls when no job is due.
    idle_wait: Duration,
}

impl Worker {
    pub fn new(queue: JobQueue, concurrency: usize) -> Self {
        Self {
            queue,
            handlers: HashMap::new(),
            concurrency: concurrency.max(1),
            worker_id: format!("worker-{}", Uuid::new_v4()),
            idle_wait: Duration::from_secs(1),
        }
    }

    pub fn register(mut self, lane: &str, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(lane.to_string(), handler);
        self
    }

    /// Run the pull loop until the process is stopped.
    pub async fn run(&self) -> Result<()> {
        let lanes: Vec<String> = self.handlers.keys().cloned().collect();
        info!(
            worker_id = %self.worker_id,
            lanes = ?lanes,
            concurrency = self.concurrency,
            "Worker starting"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        loop {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore closed");

            let lane_refs: Vec<&str> = lanes.iter().map(String::as_str).collect();
            let job = match self.queue.fetch_due(&lane_refs, &self.worker_id).await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    drop(permit);
                    tokio::time::sleep(self.idle_wait).await;
                    continue;
                }
                Err(e) => {
                    drop(permit);
                    error!(error = %e, "Failed to poll queue, backing off");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            let handler = match self.handlers.get(&job.lane) {
                Some(h) => h.clone(),
                None => {
                    // Shouldn't happen: we only pull from registered lanes.
                    self.drop_unhandled(&job).await;
                    drop(permit);
                    continue;
                }
            };

            let queue = self.queue.clone();
            tokio::spawn(async move {
                let id = job.id;
                let lane = job.lane.clone();
                let result = handler.handle(job.clone()).await;
                let outcome = match result {
                    Ok(()) => queue.complete(id).await,
                    Err(e) => {
                        warn!(id = %id, lane = %lane, error = %e, "Job failed");
                        queue.fail(&job).await
                    }
                };
                if let Err(e) = outcome {
                    error!(id = %id, error = %e, "Failed to settle job");
                }
                drop(permit);
            });
        }
    }

    /// Discard a job that arrived on a lane with no handler. A settle
    /// failure here must not take the pull loop down; the visibility
    /// timeout redelivers the job eventually.
    async fn drop_unhandled(&self, job: &Job) {
        warn!(lane = %job.lane, id = %job.id, "No handler for lane, dropping job");
        if let Err(e) = self.queue.complete(job.id).await {
            error!(id = %job.id, error = %e, "Failed to drop unhandled job");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn dropping_an_unhandled_job_survives_settle_failure() {
        // A lazy pool that can never connect makes complete() fail.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://127.0.0.1:1/unused")
            .unwrap();
        let worker = Worker::new(JobQueue::new(pool), 1);

        let job = Job {
            id: Uuid::new_v4(),
            lane: "orphan-lane".to_string(),
            payload: json!({}),
            attempts: 1,
        };
        // Must log and return rather than propagate the database error.
        worker.drop_unhandled(&job).await;
    }
}
