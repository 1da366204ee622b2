use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chan_client::ChanClient;
use hatecheck_client::HatecheckClient;
use moodwire_common::{Config, MonitoredScopes};
use moodwire_crawler::handlers::{CatalogHandler, CrawlContext, SubredditHandler, ThreadHandler};
use moodwire_crawler::jobs::{CrawlCatalogJob, CrawlSubredditJob, LANE_CATALOG, LANE_SUBREDDIT, LANE_THREAD};
use moodwire_queue::{JobQueue, Worker};
use moodwire_scoring::{SentimentScorer, ToxicityScorer};
use moodwire_store::Store;
use reddit_client::RedditClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("moodwire=info".parse()?))
        .init();

    info!("Moodwire crawler starting...");

    let config = Config::from_env();

    let scopes = MonitoredScopes::load(&config.boards_file, &config.subreddits_file)?;
    if scopes.is_empty() {
        anyhow::bail!("no monitored boards or subreddits configured, nothing to crawl");
    }
    info!(
        boards = ?scopes.boards,
        subreddits = ?scopes.subreddits,
        "Loaded monitored scopes"
    );

    let store = Store::connect(&config.database_url).await?;
    store.migrate().await?;

    // Stale boards linger in the content tables after being dropped from the
    // allow-list; surface the difference at startup.
    let stored_boards = store.distinct_boards().await?;
    for board in &stored_boards {
        if !scopes.has_board(board) {
            warn!(board = %board, "Stored board is no longer monitored");
        }
    }

    let queue = JobQueue::new(store.pool().clone());

    // Delayed re-enqueues from a previous run would double up with the fresh
    // seeds below, so start from an empty queue. clear_all logs what it
    // removed.
    queue.clear_all().await?;

    for board in &scopes.boards {
        queue
            .push(
                LANE_CATALOG,
                &CrawlCatalogJob { board: board.clone(), previous_threads: Vec::new() },
            )
            .await?;
    }
    for subreddit in &scopes.subreddits {
        queue
            .push(LANE_SUBREDDIT, &CrawlSubredditJob { subreddit: subreddit.clone() })
            .await?;
    }
    info!(
        boards = scopes.boards.len(),
        subreddits = scopes.subreddits.len(),
        "Seeded crawl jobs"
    );

    let toxicity_client = HatecheckClient::new(&config.toxicity_endpoint, &config.toxicity_api_key);
    let ctx = Arc::new(CrawlContext {
        chan: ChanClient::new(),
        reddit: RedditClient::new(),
        store,
        queue: queue.clone(),
        scopes,
        sentiment: SentimentScorer::new(),
        toxicity: ToxicityScorer::new(toxicity_client),
        poll_interval: Duration::from_secs(config.crawl_interval_secs),
    });

    let worker = Worker::new(queue, config.worker_concurrency)
        .register(LANE_CATALOG, Arc::new(CatalogHandler::new(ctx.clone())))
        .register(LANE_THREAD, Arc::new(ThreadHandler::new(ctx.clone())))
        .register(LANE_SUBREDDIT, Arc::new(SubredditHandler::new(ctx)));

    worker.run().await?;

    Ok(())
}
