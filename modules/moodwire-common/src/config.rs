use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Toxicity classifier
    pub toxicity_api_key: String,
    pub toxicity_endpoint: String,

    // Monitored-scope allow-list files
    pub boards_file: String,
    pub subreddits_file: String,

    // Crawl tuning
    pub worker_concurrency: usize,
    pub crawl_interval_secs: u64,

    // Aggregation API
    pub api_host: String,
    pub api_port: u16,
}

const DEFAULT_TOXICITY_ENDPOINT: &str = "https://api.moderatehatespeech.com/api/v1/moderate/";

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            toxicity_api_key: required_env("TOXICITY_API_KEY"),
            toxicity_endpoint: env::var("TOXICITY_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_TOXICITY_ENDPOINT.to_string()),
            boards_file: env::var("BOARDS_FILE").unwrap_or_else(|_| "boards.json".to_string()),
            subreddits_file: env::var("SUBREDDITS_FILE")
                .unwrap_or_else(|_| "subreddits.json".to_string()),
            worker_concurrency: env::var("WORKER_CONCURRENCY")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("WORKER_CONCURRENCY must be a number"),
            crawl_interval_secs: env::var("CRAWL_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("CRAWL_INTERVAL_SECS must be a number"),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
        }
    }

    /// Load a minimal config for the aggregation API (read-only, no crawl keys needed).
    pub fn api_from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            toxicity_api_key: String::new(),
            toxicity_endpoint: String::new(),
            boards_file: env::var("BOARDS_FILE").unwrap_or_else(|_| "boards.json".to_string()),
            subreddits_file: env::var("SUBREDDITS_FILE")
                .unwrap_or_else(|_| "subreddits.json".to_string()),
            worker_concurrency: 0,
            crawl_interval_secs: 0,
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
