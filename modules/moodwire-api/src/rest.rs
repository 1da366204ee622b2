use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use moodwire_common::{MediaFlags, MonitoredScopes, Platform};

use crate::db::{ApiStore, Metric};
use crate::stats;

pub struct AppState {
    pub db: ApiStore,
    pub scopes: MonitoredScopes,
}

const HISTOGRAM_BINS: usize = 50;

// --- Query structs ---

#[derive(Deserialize)]
pub struct TrendQuery {
    platforms: Option<String>,
    metrics: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Deserialize)]
pub struct ToxicityEngagementQuery {
    subreddit: Option<String>,
}

#[derive(Deserialize)]
pub struct DistributionQuery {
    platform: Option<String>,
    community: Option<String>,
}

#[derive(Deserialize)]
pub struct MediaQuery {
    subreddit: Option<String>,
}

// --- Helpers ---

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn parse_platform(raw: &str) -> Option<Platform> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "4chan" | "chan" => Some(Platform::Chan),
        "reddit" => Some(Platform::Reddit),
        _ => None,
    }
}

/// Accepts a bare date (`2024-05-01`) or a full RFC 3339 timestamp. Bare
/// dates resolve to midnight, or end of day for the range's upper bound.
fn parse_date(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)?
    };
    Some(date.and_time(time).and_utc())
}

// --- Handlers ---

pub async fn health() -> &'static str {
    "ok"
}

/// Hour-bucketed averages fanned out per (platform, metric) pair.
pub async fn trend_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendQuery>,
) -> Response {
    let platform_args = params.platforms.as_deref().unwrap_or("4chan,reddit");
    let mut platforms = Vec::new();
    for raw in platform_args.split(',') {
        match parse_platform(raw) {
            Some(p) if !platforms.contains(&p) => platforms.push(p),
            Some(_) => {}
            None => return error_response(StatusCode::BAD_REQUEST, "unknown platform"),
        }
    }

    let metric_args = params.metrics.as_deref().unwrap_or("sentiment,toxicity");
    let mut metrics = Vec::new();
    for raw in metric_args.split(',') {
        match Metric::parse(raw) {
            Some(m) if !metrics.contains(&m) => metrics.push(m),
            Some(_) => {}
            None => return error_response(StatusCode::BAD_REQUEST, "unknown metric"),
        }
    }

    let end = match &params.end_date {
        Some(raw) => match parse_date(raw, true) {
            Some(ts) => ts,
            None => return error_response(StatusCode::BAD_REQUEST, "invalid end_date"),
        },
        None => Utc::now(),
    };
    let start = match &params.start_date {
        Some(raw) => match parse_date(raw, false) {
            Some(ts) => ts,
            None => return error_response(StatusCode::BAD_REQUEST, "invalid start_date"),
        },
        None => end - Duration::days(7),
    };
    if start >= end {
        return error_response(StatusCode::BAD_REQUEST, "start_date must precede end_date");
    }

    let mut data = Vec::new();
    for &platform in &platforms {
        for &metric in &metrics {
            let points = match state.db.trend_points(platform, metric, start, end).await {
                Ok(points) => points,
                Err(e) => {
                    warn!(error = %e, "Failed to load trend points");
                    return error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "failed to load trend data",
                    );
                }
            };
            for (bucket, value) in points {
                data.push(json!({
                    "time": bucket.to_rfc3339(),
                    "value": value,
                    "platform": platform.label(),
                    "metric": metric.label(),
                }));
            }
        }
    }

    Json(json!({ "data": data })).into_response()
}

/// Monitored communities per platform, from the crawl allow-lists.
pub async fn platforms_metadata(State(state): State<Arc<AppState>>) -> Response {
    Json(json!({
        "platforms": [
            {
                "name": Platform::Chan.label(),
                "communities": state.scopes.boards.clone(),
            },
            {
                "name": Platform::Reddit.label(),
                "communities": state.scopes.subreddits.clone(),
            },
        ]
    }))
    .into_response()
}

pub async fn subreddits(State(state): State<Arc<AppState>>) -> Response {
    match state.db.scored_subreddits().await {
        Ok(subs) => Json(json!({ "subreddits": subs })).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load subreddits");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load subreddits")
        }
    }
}

/// Scatter of submission toxicity against engagement, with an OLS fit.
pub async fn toxicity_engagement(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ToxicityEngagementQuery>,
) -> Response {
    let Some(subreddit) = params.subreddit.as_deref().filter(|s| !s.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "subreddit query parameter is required");
    };
    if !state.scopes.has_subreddit(subreddit) {
        return error_response(StatusCode::BAD_REQUEST, "unknown subreddit");
    }

    let points = match state.db.toxicity_engagement(subreddit).await {
        Ok(points) => points,
        Err(e) => {
            warn!(subreddit, error = %e, "Failed to load toxicity-engagement rows");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load data");
        }
    };
    if points.is_empty() {
        return error_response(StatusCode::NOT_FOUND, "no scored submissions for subreddit");
    }

    let toxicity: Vec<f64> = points.iter().map(|(t, _)| *t).collect();
    let engagement: Vec<f64> = points.iter().map(|(_, e)| *e).collect();
    let regression = stats::linear_regression(&points).map(|fit| {
        json!({
            "slope": fit.slope,
            "intercept": fit.intercept,
            "r_squared": fit.r_squared,
            "correlation": fit.correlation,
        })
    });

    let point_objs: Vec<serde_json::Value> = points
        .iter()
        .map(|(t, e)| json!({ "toxicity": t, "engagement": e }))
        .collect();

    Json(json!({
        "subreddit": subreddit,
        "points": point_objs,
        "regression": regression,
        "mean_toxicity": stats::mean(&toxicity),
        "mean_engagement": stats::mean(&engagement),
        "count": points.len(),
    }))
    .into_response()
}

/// Histogram of sentiment values over [-1, 1].
pub async fn sentiment_distribution(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DistributionQuery>,
) -> Response {
    let platform = match params.platform.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => match parse_platform(raw) {
            Some(p) => Some(p),
            None => return error_response(StatusCode::BAD_REQUEST, "unknown platform"),
        },
        None => None,
    };
    let community = params.community.as_deref().filter(|c| !c.is_empty());

    let values = match state.db.sentiment_values(platform, community).await {
        Ok(values) => values,
        Err(e) => {
            warn!(error = %e, "Failed to load sentiment values");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load data");
        }
    };
    if values.is_empty() {
        return error_response(StatusCode::NOT_FOUND, "no sentiment scores for selection");
    }

    let positive = values.iter().filter(|v| **v > 0.0).count();
    Json(json!({
        "bins": stats::bin_centers(HISTOGRAM_BINS, -1.0, 1.0),
        "density": stats::histogram_density(&values, HISTOGRAM_BINS, -1.0, 1.0),
        "mean": stats::mean(&values),
        "median": stats::median(&values),
        "std_dev": stats::std_dev(&values),
        "count": values.len(),
        "positive_pct": 100.0 * positive as f64 / values.len() as f64,
    }))
    .into_response()
}

/// Average sentiment and toxicity grouped by media composition.
pub async fn media_metrics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MediaQuery>,
) -> Response {
    let subreddit = params.subreddit.as_deref().filter(|s| !s.is_empty());

    let rows = match state.db.media_rows(subreddit).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "Failed to load media rows");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load data");
        }
    };

    let mut groups: std::collections::BTreeMap<&'static str, (f64, f64, usize)> =
        std::collections::BTreeMap::new();
    for (media, sentiment, toxicity) in &rows {
        let flags: MediaFlags = match serde_json::from_value(media.clone()) {
            Ok(flags) => flags,
            Err(_) => continue,
        };
        // Mixed/unknown compositions have no label and are left out of the
        // breakdown, matching the dashboard's buckets.
        let Some(label) = flags.label() else { continue };
        let entry = groups.entry(label).or_insert((0.0, 0.0, 0));
        entry.0 += sentiment;
        entry.1 += toxicity;
        entry.2 += 1;
    }

    let metrics: Vec<serde_json::Value> = groups
        .into_iter()
        .map(|(label, (sentiment_sum, toxicity_sum, count))| {
            json!({
                "media_type": label,
                "avg_sentiment": sentiment_sum / count as f64,
                "avg_toxicity": toxicity_sum / count as f64,
                "count": count,
            })
        })
        .collect();

    Json(json!({ "metrics": metrics })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_platform_accepts_both_spellings() {
        assert_eq!(parse_platform("4chan"), Some(Platform::Chan));
        assert_eq!(parse_platform("Reddit"), Some(Platform::Reddit));
        assert_eq!(parse_platform("tumblr"), None);
    }

    #[test]
    fn parse_date_handles_bare_dates_and_timestamps() {
        let start = parse_date("2024-05-01", false).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-05-01T00:00:00+00:00");

        let end = parse_date("2024-05-01", true).unwrap();
        assert_eq!(end.to_rfc3339(), "2024-05-01T23:59:59+00:00");

        let full = parse_date("2024-05-01T12:30:00Z", false).unwrap();
        assert_eq!(full.to_rfc3339(), "2024-05-01T12:30:00+00:00");

        assert!(parse_date("yesterday", false).is_none());
    }
}
