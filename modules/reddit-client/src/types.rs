use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reddit listing envelope: `{"kind": "Listing", "data": {"children": [...]}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<Child>,
}

/// A child of a listing. `kind` is "t3" for submissions, "t1" for comments.
#[derive(Debug, Clone, Deserialize)]
pub struct Child {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// A submission (link/self post). Every field the scoring engine or store
/// reads has an explicit default so malformed payloads degrade to "missing".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub selftext_html: Option<String>,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub post_hint: Option<String>,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub media: Option<Value>,
    #[serde(default)]
    pub preview: Option<Value>,
    #[serde(default)]
    pub gallery_data: Option<Value>,
    #[serde(default)]
    pub media_metadata: Option<Value>,
}

/// A comment, flattened out of the reply tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub subreddit: String,
    /// Raw replies listing; "" when there are none. Consumed by
    /// `flatten_comments`, not serialized back out.
    #[serde(default, skip_serializing)]
    pub replies: Value,
}

/// Recursively flatten a comment tree into a flat list. "more" stubs and
/// malformed children are skipped; missing comments are accepted data loss.
pub fn flatten_comments(children: &[Child]) -> Vec<Comment> {
    let mut comments = Vec::new();
    for child in children {
        if child.kind != "t1" {
            continue;
        }
        let comment: Comment = match serde_json::from_value(child.data.clone()) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed comment");
                continue;
            }
        };

        let replies = comment.replies.clone();
        comments.push(Comment {
            replies: Value::Null,
            ..comment
        });

        if let Ok(listing) = serde_json::from_value::<Listing>(replies) {
            comments.extend(flatten_comments(&listing.data.children));
        }
    }
    comments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_walks_nested_replies() {
        let raw = r#"[
            {"kind": "t1", "data": {
                "id": "c1", "body": "top", "score": 5, "created_utc": 1.0,
                "replies": {"kind": "Listing", "data": {"children": [
                    {"kind": "t1", "data": {"id": "c2", "body": "nested", "score": 1,
                                            "created_utc": 2.0, "replies": ""}}
                ]}}
            }},
            {"kind": "more", "data": {"count": 10}}
        ]"#;
        let children: Vec<Child> = serde_json::from_str(raw).unwrap();
        let flat = flatten_comments(&children);
        let ids: Vec<&str> = flat.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn submission_defaults_cover_missing_fields() {
        let sub: Submission = serde_json::from_str(r#"{"id": "abc", "title": "t"}"#).unwrap();
        assert_eq!(sub.id, "abc");
        assert_eq!(sub.selftext, "");
        assert_eq!(sub.score, 0);
        assert!(!sub.is_video);
        assert!(sub.media.is_none());
    }
}
