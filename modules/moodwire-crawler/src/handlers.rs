use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tracing::{info, warn};

use chan_client::{thread_numbers, ChanClient};
use moodwire_common::{MediaFlags, MonitoredScopes};
use moodwire_queue::{Job, JobHandler, JobQueue};
use moodwire_scoring::{aggregate, media_flags, SentimentScorer, ToxicityScorer};
use moodwire_store::{RedditScoreInsert, Store};
use reddit_client::RedditClient;

use crate::diff::dead_threads;
use crate::jobs::{CrawlCatalogJob, CrawlSubredditJob, CrawlThreadJob, LANE_CATALOG, LANE_SUBREDDIT, LANE_THREAD};

/// Everything a crawl handler needs. One instance is shared by all handlers
/// of a worker process.
pub struct CrawlContext {
    pub chan: ChanClient,
    pub reddit: RedditClient,
    pub store: Store,
    pub queue: JobQueue,
    pub scopes: MonitoredScopes,
    pub sentiment: SentimentScorer,
    pub toxicity: ToxicityScorer,
    /// Delay between successive polls of the same board or subreddit.
    pub poll_interval: Duration,
}

fn epoch_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs as i64, 0).single()
}

/// Polls a board catalog, archives threads that fell off it since the last
/// poll, and re-enqueues itself for the next interval.
pub struct CatalogHandler {
    ctx: Arc<CrawlContext>,
}

impl CatalogHandler {
    pub fn new(ctx: Arc<CrawlContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl JobHandler for CatalogHandler {
    async fn handle(&self, job: Job) -> anyhow::Result<()> {
        let payload: CrawlCatalogJob = serde_json::from_value(job.payload)?;

        if !self.ctx.scopes.has_board(&payload.board) {
            info!(board = %payload.board, "Board no longer monitored, dropping catalog poll");
            return Ok(());
        }

        let catalog = match self.ctx.chan.fetch_catalog(&payload.board).await? {
            Some(catalog) => catalog,
            None => {
                // Keep the chain alive with the snapshot we already have so
                // a transient outage does not orphan the board.
                warn!(board = %payload.board, "Catalog unavailable, retrying next interval");
                self.ctx
                    .queue
                    .push_delayed(LANE_CATALOG, &payload, self.ctx.poll_interval)
                    .await?;
                return Ok(());
            }
        };

        let current = thread_numbers(&catalog);
        let dead = dead_threads(&payload.previous_threads, &current);
        info!(
            board = %payload.board,
            active = current.len(),
            dead = dead.len(),
            "Catalog polled"
        );

        for thread_no in dead {
            self.ctx
                .queue
                .push(
                    LANE_THREAD,
                    &CrawlThreadJob { board: payload.board.clone(), thread_no },
                )
                .await?;
        }

        self.ctx
            .queue
            .push_delayed(
                LANE_CATALOG,
                &CrawlCatalogJob { board: payload.board, previous_threads: current },
                self.ctx.poll_interval,
            )
            .await?;

        Ok(())
    }
}

/// Archives one dead thread: stores every post and scores the ones that
/// carry a body.
pub struct ThreadHandler {
    ctx: Arc<CrawlContext>,
}

impl ThreadHandler {
    pub fn new(ctx: Arc<CrawlContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl JobHandler for ThreadHandler {
    async fn handle(&self, job: Job) -> anyhow::Result<()> {
        let payload: CrawlThreadJob = serde_json::from_value(job.payload)?;

        if !self.ctx.scopes.has_board(&payload.board) {
            info!(board = %payload.board, "Board no longer monitored, dropping thread job");
            return Ok(());
        }

        let thread = match self
            .ctx
            .chan
            .fetch_thread(&payload.board, payload.thread_no)
            .await?
        {
            Some(thread) => thread,
            None => {
                warn!(
                    board = %payload.board,
                    thread_no = payload.thread_no,
                    "Thread already purged upstream, nothing to archive"
                );
                return Ok(());
            }
        };

        let crawled_at = Utc::now();
        let mut stored = 0usize;
        let mut scored = 0usize;

        for post in &thread.posts {
            let Some(post_no) = post.no else {
                warn!(board = %payload.board, "Post without a number, skipping");
                continue;
            };
            let thread_no = post.thread_no().unwrap_or(payload.thread_no);

            let data = serde_json::to_value(post)?;
            if let Err(e) = self
                .ctx
                .store
                .upsert_chan_post(&payload.board, thread_no as i64, post_no as i64, &data, crawled_at)
                .await
            {
                warn!(board = %payload.board, post_no, error = %e, "Failed to store post");
                continue;
            }
            stored += 1;

            // Posts without a body (image-only) are archived but not scored.
            let Some(com) = post.com.as_deref().filter(|c| !c.is_empty()) else {
                continue;
            };
            let Some(time) = post.time else {
                warn!(board = %payload.board, post_no, "Post without a timestamp, skipping score");
                continue;
            };
            let created_utc = match Utc.timestamp_opt(time, 0).single() {
                Some(t) => t,
                None => {
                    warn!(board = %payload.board, post_no, time, "Unrepresentable timestamp, skipping score");
                    continue;
                }
            };

            let sentiment = self.ctx.sentiment.score(com);
            if let Err(e) = self
                .ctx
                .store
                .upsert_chan_sentiment(&payload.board, thread_no as i64, post_no as i64, sentiment, created_utc)
                .await
            {
                warn!(board = %payload.board, post_no, error = %e, "Failed to store sentiment");
            }

            let toxicity = self.ctx.toxicity.score_discrete(com).await;
            if let Err(e) = self
                .ctx
                .store
                .upsert_chan_toxicity(&payload.board, thread_no as i64, post_no as i64, toxicity.value, created_utc)
                .await
            {
                warn!(board = %payload.board, post_no, error = %e, "Failed to store toxicity");
            }
            scored += 1;
        }

        info!(
            board = %payload.board,
            thread_no = payload.thread_no,
            posts = thread.posts.len(),
            stored,
            scored,
            "Thread archived"
        );

        Ok(())
    }
}

/// Sweeps a subreddit's newest submissions, stores posts and comments,
/// scores everything, and re-enqueues itself for the next interval.
pub struct SubredditHandler {
    ctx: Arc<CrawlContext>,
}

impl SubredditHandler {
    pub fn new(ctx: Arc<CrawlContext>) -> Self {
        Self { ctx }
    }

    async fn sweep(&self, subreddit: &str) -> anyhow::Result<()> {
        let submissions = match self.ctx.reddit.fetch_new_posts(subreddit, 100).await? {
            Some(submissions) => submissions,
            None => {
                warn!(subreddit, "Listing unavailable, retrying next interval");
                return Ok(());
            }
        };

        let crawled_at = Utc::now();
        info!(subreddit, submissions = submissions.len(), "Sweeping subreddit");

        for submission in &submissions {
            if submission.id.is_empty() {
                warn!(subreddit, "Submission without an id, skipping");
                continue;
            }

            let data = serde_json::to_value(submission)?;
            if let Err(e) = self
                .ctx
                .store
                .upsert_reddit_post(&submission.id, subreddit, &data, crawled_at)
                .await
            {
                warn!(subreddit, post_id = %submission.id, error = %e, "Failed to store submission");
                continue;
            }

            let comments = match self.ctx.reddit.fetch_comments(subreddit, &submission.id).await {
                Ok(Some(comments)) => comments,
                Ok(None) => {
                    warn!(subreddit, post_id = %submission.id, "Comment tree unavailable");
                    Vec::new()
                }
                Err(e) => {
                    warn!(subreddit, post_id = %submission.id, error = %e, "Failed to fetch comments");
                    Vec::new()
                }
            };

            let mut child_sentiments = Vec::new();
            let mut child_toxicities = Vec::new();

            for comment in &comments {
                if comment.id.is_empty() {
                    continue;
                }

                let comment_data = serde_json::to_value(comment)?;
                if let Err(e) = self
                    .ctx
                    .store
                    .upsert_reddit_comment(&comment.id, &submission.id, subreddit, &comment_data, crawled_at)
                    .await
                {
                    warn!(subreddit, comment_id = %comment.id, error = %e, "Failed to store comment");
                    continue;
                }

                if comment.body.is_empty() {
                    continue;
                }
                let Some(comment_created) = epoch_to_utc(comment.created_utc) else {
                    warn!(
                        subreddit,
                        comment_id = %comment.id,
                        created_utc = comment.created_utc,
                        "Unrepresentable timestamp, skipping score"
                    );
                    continue;
                };

                let sentiment = self.ctx.sentiment.score(&comment.body);
                let toxicity = self.ctx.toxicity.score_continuous(&comment.body).await;
                child_sentiments.push(sentiment);
                child_toxicities.push(toxicity.value);

                let row = RedditScoreInsert {
                    content_type: "comment".to_string(),
                    content_id: comment.id.clone(),
                    subreddit: subreddit.to_string(),
                    score: sentiment,
                    media: MediaFlags { text: true, image: false, video: false },
                    created_utc: comment_created,
                    popularity: comment.score as i32,
                    num_comments: None,
                };
                if let Err(e) = self.ctx.store.upsert_reddit_sentiment(&row).await {
                    warn!(subreddit, comment_id = %comment.id, error = %e, "Failed to store comment sentiment");
                }
                let row = RedditScoreInsert { score: toxicity.value, ..row };
                if let Err(e) = self.ctx.store.upsert_reddit_toxicity(&row).await {
                    warn!(subreddit, comment_id = %comment.id, error = %e, "Failed to store comment toxicity");
                }
            }

            // The submission stays archived even when its timestamp cannot
            // be represented; only the score rows need it.
            let Some(post_created) = epoch_to_utc(submission.created_utc) else {
                warn!(
                    subreddit,
                    post_id = %submission.id,
                    created_utc = submission.created_utc,
                    "Unrepresentable timestamp, skipping score"
                );
                continue;
            };

            let title_sentiment = self.ctx.sentiment.score(&submission.title);
            let body_sentiment = self.ctx.sentiment.score(&submission.selftext);
            let post_sentiment = aggregate(title_sentiment, body_sentiment, &child_sentiments);

            let title_toxicity = self.ctx.toxicity.score_continuous(&submission.title).await;
            let body_toxicity = self.ctx.toxicity.score_continuous(&submission.selftext).await;
            let post_toxicity =
                aggregate(title_toxicity.value, body_toxicity.value, &child_toxicities);

            let row = RedditScoreInsert {
                content_type: "post".to_string(),
                content_id: submission.id.clone(),
                subreddit: subreddit.to_string(),
                score: post_sentiment,
                media: media_flags(submission),
                created_utc: post_created,
                popularity: submission.score as i32,
                num_comments: Some(submission.num_comments as i32),
            };
            if let Err(e) = self.ctx.store.upsert_reddit_sentiment(&row).await {
                warn!(subreddit, post_id = %submission.id, error = %e, "Failed to store post sentiment");
            }
            let row = RedditScoreInsert { score: post_toxicity, ..row };
            if let Err(e) = self.ctx.store.upsert_reddit_toxicity(&row).await {
                warn!(subreddit, post_id = %submission.id, error = %e, "Failed to store post toxicity");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl JobHandler for SubredditHandler {
    async fn handle(&self, job: Job) -> anyhow::Result<()> {
        let payload: CrawlSubredditJob = serde_json::from_value(job.payload)?;

        if !self.ctx.scopes.has_subreddit(&payload.subreddit) {
            info!(subreddit = %payload.subreddit, "Subreddit no longer monitored, dropping sweep");
            return Ok(());
        }

        self.sweep(&payload.subreddit).await?;

        self.ctx
            .queue
            .push_delayed(LANE_SUBREDDIT, &payload, self.ctx.poll_interval)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::Router;
    use hatecheck_client::HatecheckClient;
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    async fn counting_server() -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let app = Router::new().fallback(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "{}"
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    /// Context wired to a hit-counting HTTP server and a lazy pool that
    /// never connects. Any network call or database write would show up as
    /// a counted hit or a connection error.
    fn offline_context(base: &str) -> Arc<CrawlContext> {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://127.0.0.1:1/unused")
            .unwrap();
        Arc::new(CrawlContext {
            chan: ChanClient::new().with_base_url(base),
            reddit: RedditClient::new().with_base_url(base),
            store: Store::new(pool.clone()),
            queue: JobQueue::new(pool),
            scopes: MonitoredScopes {
                boards: vec!["g".to_string()],
                subreddits: vec!["rust".to_string()],
            },
            sentiment: SentimentScorer::new(),
            toxicity: ToxicityScorer::new(HatecheckClient::new(base, "token")),
            poll_interval: Duration::from_secs(300),
        })
    }

    fn job_for(lane: &str, payload: serde_json::Value) -> Job {
        Job {
            id: uuid::Uuid::new_v4(),
            lane: lane.to_string(),
            payload,
            attempts: 1,
        }
    }

    #[tokio::test]
    async fn unmonitored_board_catalog_poll_is_a_no_op() {
        let (base, hits) = counting_server().await;
        let handler = CatalogHandler::new(offline_context(&base));

        let job = job_for(LANE_CATALOG, json!({"board": "x", "previous_threads": [1, 2]}));
        handler.handle(job).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unmonitored_board_thread_job_is_a_no_op() {
        let (base, hits) = counting_server().await;
        let handler = ThreadHandler::new(offline_context(&base));

        let job = job_for(LANE_THREAD, json!({"board": "x", "thread_no": 42}));
        handler.handle(job).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unmonitored_subreddit_sweep_is_a_no_op() {
        let (base, hits) = counting_server().await;
        let handler = SubredditHandler::new(offline_context(&base));

        let job = job_for(LANE_SUBREDDIT, json!({"subreddit": "nothere"}));
        handler.handle(job).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unrepresentable_timestamps_are_rejected() {
        assert!(epoch_to_utc(1_700_000_000.0).is_some());
        assert!(epoch_to_utc(0.0).is_some());
        assert!(epoch_to_utc(f64::MAX).is_none());
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let (base, _hits) = counting_server().await;
        let handler = ThreadHandler::new(offline_context(&base));

        let job = job_for(LANE_THREAD, json!({"board": "g"}));
        assert!(handler.handle(job).await.is_err());
    }
}
