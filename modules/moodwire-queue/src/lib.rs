// Durable Postgres-backed job queue: named lanes, delayed scheduling,
// at-least-once delivery. Handlers must be idempotent — a job claimed by a
// worker that dies is redelivered after the visibility timeout.

pub mod error;
pub mod worker;

pub use error::{QueueError, Result};
pub use worker::{JobHandler, Worker};

use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

/// Visibility timeout: a claimed job whose lock is older than this is
/// considered abandoned and becomes claimable again.
const VISIBILITY_TIMEOUT_SECS: f64 = 600.0;

/// Jobs that have failed this many times are dropped with an error log.
const MAX_ATTEMPTS: i32 = 5;

/// A claimed job. `attempts` counts this delivery.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub lane: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
}

#[derive(Clone)]
pub struct JobQueue {
    pool: PgPool,
}

impl JobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Enqueue a job for immediate execution.
    pub async fn push<P: Serialize>(&self, lane: &str, payload: &P) -> Result<Uuid> {
        self.push_at(lane, payload, Duration::ZERO).await
    }

    /// Enqueue a job that must not run before `delay` has elapsed.
    pub async fn push_delayed<P: Serialize>(
        &self,
        lane: &str,
        payload: &P,
        delay: Duration,
    ) -> Result<Uuid> {
        self.push_at(lane, payload, delay).await
    }

    async fn push_at<P: Serialize>(&self, lane: &str, payload: &P, delay: Duration) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO jobs (id, lane, payload, run_at)
            VALUES ($1, $2, $3, now() + ($4 * interval '1 second'))
            "#,
        )
        .bind(id)
        .bind(lane)
        .bind(serde_json::to_value(payload)?)
        .bind(delay.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Remove every pending job in a lane.
    pub async fn clear_lane(&self, lane: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jobs WHERE lane = $1")
            .bind(lane)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove every job. Used at orchestrator startup so a crashed previous
    /// run cannot leave poisoned catalog-diff state behind.
    pub async fn clear_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jobs").execute(&self.pool).await?;
        let cleared = result.rows_affected();
        if cleared > 0 {
            info!(cleared, "Cleared stale jobs from queue");
        }
        Ok(cleared)
    }

    /// Claim the next due job in any of the given lanes, if one exists.
    /// `FOR UPDATE SKIP LOCKED` arbitrates between concurrent workers.
    pub async fn fetch_due(&self, lanes: &[&str], worker_id: &str) -> Result<Option<Job>> {
        let lanes: Vec<String> = lanes.iter().map(|l| l.to_string()).collect();
        let job = sqlx::query_as::<_, Job>(
            r#"
            WITH next AS (
                SELECT id FROM jobs
                WHERE lane = ANY($1)
                  AND run_at <= now()
                  AND (locked_at IS NULL
                       OR locked_at < now() - ($3 * interval '1 second'))
                ORDER BY run_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            UPDATE jobs
            SET locked_at = now(), locked_by = $2, attempts = attempts + 1
            FROM next
            WHERE jobs.id = next.id
            RETURNING jobs.id, jobs.lane, jobs.payload, jobs.attempts
            "#,
        )
        .bind(&lanes)
        .bind(worker_id)
        .bind(VISIBILITY_TIMEOUT_SECS)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Delete a finished job.
    pub async fn complete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Release a failed job for redelivery with a linear backoff, or drop it
    /// once it has exhausted its attempt budget.
    pub async fn fail(&self, job: &Job) -> Result<()> {
        if job.attempts >= MAX_ATTEMPTS {
            error!(
                id = %job.id,
                lane = %job.lane,
                attempts = job.attempts,
                "Job exhausted its attempts, dropping"
            );
            return self.complete(job.id).await;
        }

        sqlx::query(
            r#"
            UPDATE jobs
            SET locked_at = NULL,
                locked_by = NULL,
                run_at = now() + (attempts * interval '30 seconds')
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Pending jobs in a lane, due or not. Diagnostics only.
    pub async fn lane_depth(&self, lane: &str) -> Result<i64> {
        let depth = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM jobs WHERE lane = $1")
            .bind(lane)
            .fetch_one(&self.pool)
            .await?;
        Ok(depth)
    }
}
