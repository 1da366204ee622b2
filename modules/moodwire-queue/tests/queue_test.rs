// Integration tests against a live Postgres. Run with:
//   TEST_DATABASE_URL=postgres://... cargo test -p moodwire-queue -- --ignored

use std::time::Duration;

use serde_json::json;

use moodwire_queue::JobQueue;
use moodwire_store::Store;

async fn test_queue() -> JobQueue {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for queue integration tests");
    let store = Store::connect(&url).await.expect("connect");
    store.migrate().await.expect("migrate");
    let queue = JobQueue::new(store.pool().clone());
    queue.clear_all().await.expect("clear");
    queue
}

#[tokio::test]
#[ignore]
async fn push_claim_complete_round_trip() {
    let queue = test_queue().await;

    queue.push("lane-a", &json!({"n": 1})).await.unwrap();

    let job = queue
        .fetch_due(&["lane-a"], "w1")
        .await
        .unwrap()
        .expect("job should be due");
    assert_eq!(job.lane, "lane-a");
    assert_eq!(job.payload["n"], 1);
    assert_eq!(job.attempts, 1);

    // Claimed: a second worker sees nothing.
    assert!(queue.fetch_due(&["lane-a"], "w2").await.unwrap().is_none());

    queue.complete(job.id).await.unwrap();
    assert_eq!(queue.lane_depth("lane-a").await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn delayed_jobs_are_not_claimable_before_run_at() {
    let queue = test_queue().await;

    queue
        .push_delayed("lane-b", &json!({}), Duration::from_secs(3600))
        .await
        .unwrap();

    assert!(queue.fetch_due(&["lane-b"], "w1").await.unwrap().is_none());
    assert_eq!(queue.lane_depth("lane-b").await.unwrap(), 1);
}

#[tokio::test]
#[ignore]
async fn failed_jobs_are_redelivered_then_dropped() {
    let queue = test_queue().await;

    queue.push("lane-c", &json!({})).await.unwrap();

    let mut last_attempts = 0;
    // Claim + fail until the attempt budget runs out.
    for _ in 0..10 {
        // Failed jobs are released with a backoff proportional to their
        // attempt count, so force run_at back for the test.
        sqlx::query("UPDATE jobs SET run_at = now() WHERE lane = 'lane-c'")
            .execute(queue.pool())
            .await
            .unwrap();

        match queue.fetch_due(&["lane-c"], "w1").await.unwrap() {
            Some(job) => {
                last_attempts = job.attempts;
                queue.fail(&job).await.unwrap();
            }
            None => break,
        }
    }

    assert_eq!(last_attempts, 5);
    assert_eq!(queue.lane_depth("lane-c").await.unwrap(), 0);
}
