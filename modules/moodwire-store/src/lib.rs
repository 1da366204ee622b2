// Postgres persistence for raw content and derived scores.

pub mod error;

pub use error::{Result, StoreError};

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use moodwire_common::MediaFlags;

/// Parameters for upserting a reddit score row (sentiment or toxicity).
/// `content_type` is "post" or "comment"; `popularity` is the upvote score,
/// denormalized for downstream engagement aggregation.
#[derive(Debug, Clone)]
pub struct RedditScoreInsert {
    pub content_type: String,
    pub content_id: String,
    pub subreddit: String,
    pub score: f64,
    pub media: MediaFlags,
    pub created_utc: DateTime<Utc>,
    pub popularity: i32,
    pub num_comments: Option<i32>,
}

pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to Postgres.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // --- Content ---

    /// Upsert an imageboard post. Last write wins on payload and crawl time;
    /// the unique key makes re-ingestion of the same identity idempotent.
    pub async fn upsert_chan_post(
        &self,
        board: &str,
        thread_no: i64,
        post_no: i64,
        payload: &serde_json::Value,
        crawled_at: DateTime<Utc>,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO chan_posts (board, thread_no, post_no, data, crawled_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (board, thread_no, post_no)
            DO UPDATE SET data = EXCLUDED.data, crawled_at = EXCLUDED.crawled_at
            RETURNING id
            "#,
        )
        .bind(board)
        .bind(thread_no)
        .bind(post_no)
        .bind(payload)
        .bind(crawled_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn upsert_reddit_post(
        &self,
        post_id: &str,
        subreddit: &str,
        payload: &serde_json::Value,
        crawled_at: DateTime<Utc>,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO reddit_posts (post_id, subreddit, data, crawled_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (post_id)
            DO UPDATE SET subreddit = EXCLUDED.subreddit,
                          data = EXCLUDED.data,
                          crawled_at = EXCLUDED.crawled_at
            RETURNING id
            "#,
        )
        .bind(post_id)
        .bind(subreddit)
        .bind(payload)
        .bind(crawled_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn upsert_reddit_comment(
        &self,
        comment_id: &str,
        post_id: &str,
        subreddit: &str,
        payload: &serde_json::Value,
        crawled_at: DateTime<Utc>,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO reddit_comments (comment_id, post_id, subreddit, data, crawled_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (comment_id)
            DO UPDATE SET post_id = EXCLUDED.post_id,
                          subreddit = EXCLUDED.subreddit,
                          data = EXCLUDED.data,
                          crawled_at = EXCLUDED.crawled_at
            RETURNING id
            "#,
        )
        .bind(comment_id)
        .bind(post_id)
        .bind(subreddit)
        .bind(payload)
        .bind(crawled_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Boards that have rows in the content table. Logged at crawler startup
    /// against the monitored list.
    pub async fn distinct_boards(&self) -> Result<Vec<String>> {
        let boards =
            sqlx::query_scalar::<_, String>("SELECT DISTINCT board FROM chan_posts ORDER BY board")
                .fetch_all(&self.pool)
                .await?;
        Ok(boards)
    }

    pub async fn distinct_subreddits(&self) -> Result<Vec<String>> {
        let subs = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT subreddit FROM reddit_posts ORDER BY subreddit",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subs)
    }

    // --- Scores ---

    pub async fn upsert_chan_sentiment(
        &self,
        board: &str,
        thread_no: i64,
        post_no: i64,
        score: f64,
        created_utc: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chan_sentiment_analysis
                (post_number, thread_number, board, sentiment_score, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (board, thread_number, post_number)
            DO UPDATE SET sentiment_score = EXCLUDED.sentiment_score
            "#,
        )
        .bind(post_no)
        .bind(thread_no)
        .bind(board)
        .bind(score)
        .bind(created_utc)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_chan_toxicity(
        &self,
        board: &str,
        thread_no: i64,
        post_no: i64,
        score: i32,
        created_utc: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chan_toxicity_analysis
                (post_number, thread_number, board, toxicity_score, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (board, thread_number, post_number)
            DO UPDATE SET toxicity_score = EXCLUDED.toxicity_score
            "#,
        )
        .bind(post_no)
        .bind(thread_no)
        .bind(board)
        .bind(score)
        .bind(created_utc)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_reddit_sentiment(&self, row: &RedditScoreInsert) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reddit_sentiment_analysis
                (content_type, content_id, subreddit, sentiment_score,
                 media_metadata, created_utc, score, num_comments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (content_type, content_id)
            DO UPDATE SET sentiment_score = EXCLUDED.sentiment_score,
                          media_metadata = EXCLUDED.media_metadata,
                          score = EXCLUDED.score,
                          num_comments = EXCLUDED.num_comments
            "#,
        )
        .bind(&row.content_type)
        .bind(&row.content_id)
        .bind(&row.subreddit)
        .bind(row.score)
        .bind(serde_json::to_value(row.media).unwrap_or_default())
        .bind(row.created_utc)
        .bind(row.popularity)
        .bind(row.num_comments)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_reddit_toxicity(&self, row: &RedditScoreInsert) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reddit_toxicity_analysis
                (content_type, content_id, subreddit, toxicity_score,
                 media_metadata, created_utc, score, num_comments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (content_type, content_id)
            DO UPDATE SET toxicity_score = EXCLUDED.toxicity_score,
                          media_metadata = EXCLUDED.media_metadata,
                          score = EXCLUDED.score,
                          num_comments = EXCLUDED.num_comments
            "#,
        )
        .bind(&row.content_type)
        .bind(&row.content_id)
        .bind(&row.subreddit)
        .bind(row.score)
        .bind(serde_json::to_value(row.media).unwrap_or_default())
        .bind(row.created_utc)
        .bind(row.popularity)
        .bind(row.num_comments)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
