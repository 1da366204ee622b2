//! Crawl orchestration: catalog polling, dead-thread harvesting, and
//! subreddit sweeps, all driven through the shared job queue.

pub mod diff;
pub mod handlers;
pub mod jobs;
