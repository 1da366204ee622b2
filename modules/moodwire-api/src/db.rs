use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use moodwire_common::Platform;
use moodwire_store::{Result, StoreError};

/// Metric selector shared by the trend endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Sentiment,
    Toxicity,
}

impl Metric {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sentiment" => Some(Self::Sentiment),
            "toxicity" => Some(Self::Toxicity),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Toxicity => "toxicity",
        }
    }
}

/// Read-only aggregation queries over the score tables. All analytics are
/// query-time; this type never writes.
pub struct ApiStore {
    pool: PgPool,
}

impl ApiStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(StoreError::Database)?;
        Ok(Self::new(pool))
    }

    /// Hour-bucketed average of one metric on one platform over a window.
    pub async fn trend_points(
        &self,
        platform: Platform,
        metric: Metric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, f64)>> {
        // Discrete imageboard toxicity is an INTEGER column; cast so AVG
        // decodes as float8 rather than numeric.
        let sql = match (platform, metric) {
            (Platform::Chan, Metric::Sentiment) => {
                "SELECT date_trunc('hour', created_utc) AS bucket, AVG(sentiment_score) \
                 FROM chan_sentiment_analysis \
                 WHERE created_utc >= $1 AND created_utc < $2 \
                 GROUP BY bucket ORDER BY bucket"
            }
            (Platform::Chan, Metric::Toxicity) => {
                "SELECT date_trunc('hour', created_utc) AS bucket, AVG(toxicity_score)::float8 \
                 FROM chan_toxicity_analysis \
                 WHERE created_utc >= $1 AND created_utc < $2 \
                 GROUP BY bucket ORDER BY bucket"
            }
            (Platform::Reddit, Metric::Sentiment) => {
                "SELECT date_trunc('hour', created_utc) AS bucket, AVG(sentiment_score) \
                 FROM reddit_sentiment_analysis \
                 WHERE created_utc >= $1 AND created_utc < $2 \
                 GROUP BY bucket ORDER BY bucket"
            }
            (Platform::Reddit, Metric::Toxicity) => {
                "SELECT date_trunc('hour', created_utc) AS bucket, AVG(toxicity_score) \
                 FROM reddit_toxicity_analysis \
                 WHERE created_utc >= $1 AND created_utc < $2 \
                 GROUP BY bucket ORDER BY bucket"
            }
        };

        let points = sqlx::query_as::<_, (DateTime<Utc>, f64)>(sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(points)
    }

    /// (toxicity, engagement) pairs for submissions in one subreddit.
    /// Engagement is the mean of upvote score and comment count.
    pub async fn toxicity_engagement(&self, subreddit: &str) -> Result<Vec<(f64, f64)>> {
        let points = sqlx::query_as::<_, (f64, f64)>(
            r#"
            SELECT toxicity_score,
                   (score + COALESCE(num_comments, 0))::float8 / 2.0
            FROM reddit_toxicity_analysis
            WHERE subreddit = $1 AND content_type = 'post'
            ORDER BY created_utc
            "#,
        )
        .bind(subreddit)
        .fetch_all(&self.pool)
        .await?;
        Ok(points)
    }

    /// Raw sentiment values, optionally narrowed to one platform and one
    /// community (board or subreddit).
    pub async fn sentiment_values(
        &self,
        platform: Option<Platform>,
        community: Option<&str>,
    ) -> Result<Vec<f64>> {
        let mut values = Vec::new();
        if platform.is_none() || platform == Some(Platform::Chan) {
            values.extend(self.chan_sentiment_values(community).await?);
        }
        if platform.is_none() || platform == Some(Platform::Reddit) {
            values.extend(self.reddit_sentiment_values(community).await?);
        }
        Ok(values)
    }

    async fn chan_sentiment_values(&self, board: Option<&str>) -> Result<Vec<f64>> {
        let values = match board {
            Some(board) => {
                sqlx::query_scalar::<_, f64>(
                    "SELECT sentiment_score FROM chan_sentiment_analysis WHERE board = $1",
                )
                .bind(board)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, f64>("SELECT sentiment_score FROM chan_sentiment_analysis")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(values)
    }

    async fn reddit_sentiment_values(&self, subreddit: Option<&str>) -> Result<Vec<f64>> {
        let values = match subreddit {
            Some(subreddit) => {
                sqlx::query_scalar::<_, f64>(
                    "SELECT sentiment_score FROM reddit_sentiment_analysis WHERE subreddit = $1",
                )
                .bind(subreddit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, f64>(
                    "SELECT sentiment_score FROM reddit_sentiment_analysis",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(values)
    }

    /// Per-submission (media flags, sentiment, toxicity) rows for the
    /// media-composition breakdown. Grouping by derived label happens in
    /// the handler; the flags live in a JSONB column.
    pub async fn media_rows(
        &self,
        subreddit: Option<&str>,
    ) -> Result<Vec<(serde_json::Value, f64, f64)>> {
        let base = r#"
            SELECT s.media_metadata, s.sentiment_score, t.toxicity_score
            FROM reddit_sentiment_analysis s
            JOIN reddit_toxicity_analysis t
              ON t.content_type = s.content_type AND t.content_id = s.content_id
            WHERE s.content_type = 'post'
        "#;

        let rows = match subreddit {
            Some(subreddit) => {
                let sql = format!("{base} AND s.subreddit = $1");
                sqlx::query_as::<_, (serde_json::Value, f64, f64)>(&sql)
                    .bind(subreddit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, (serde_json::Value, f64, f64)>(base)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    /// Subreddits that have at least one scored row.
    pub async fn scored_subreddits(&self) -> Result<Vec<String>> {
        let subs = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT subreddit FROM reddit_sentiment_analysis ORDER BY subreddit",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subs)
    }
}
