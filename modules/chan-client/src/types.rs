use serde::{Deserialize, Serialize};

/// One page of a board catalog. The catalog endpoint returns an array of
/// these, each listing the threads currently alive on that page.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub threads: Vec<CatalogThread>,
}

/// A thread entry in the catalog. Only the thread number matters for the
/// catalog diff; everything else in the listing is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogThread {
    pub no: Option<u64>,
}

/// A full thread: the OP post followed by replies.
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// A single post. Every field the store or scoring engine reads is an
/// explicit optional with a default, so malformed upstream data degrades to
/// "missing" rather than failing the whole thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Post number.
    pub no: Option<u64>,
    /// Thread the post replies to; 0 (or absent) for the OP.
    #[serde(default)]
    pub resto: u64,
    /// UNIX creation timestamp.
    pub time: Option<i64>,
    /// Comment body, HTML-encoded.
    pub com: Option<String>,
    /// Reply count, present on OP posts.
    pub replies: Option<i64>,
    /// Attachment fields, present when the post carries an image/webm.
    pub tim: Option<i64>,
    pub ext: Option<String>,
    pub filename: Option<String>,
}

impl Post {
    /// Thread number this post belongs to: `resto` for replies, its own
    /// number for the OP.
    pub fn thread_no(&self) -> Option<u64> {
        match self.resto {
            0 => self.no,
            resto => Some(resto),
        }
    }
}

/// Extract the set of active thread numbers from a catalog, skipping
/// malformed entries with a warning.
pub fn thread_numbers(catalog: &[CatalogPage]) -> Vec<u64> {
    let mut numbers = Vec::new();
    for page in catalog {
        for thread in &page.threads {
            match thread.no {
                Some(no) => numbers.push(no),
                None => tracing::warn!("Catalog thread entry without a number, skipping"),
            }
        }
    }
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_no_falls_back_to_own_number_for_op() {
        let op = Post {
            no: Some(100),
            resto: 0,
            time: Some(0),
            com: None,
            replies: Some(3),
            tim: None,
            ext: None,
            filename: None,
        };
        assert_eq!(op.thread_no(), Some(100));

        let reply = Post { no: Some(101), resto: 100, ..op.clone() };
        assert_eq!(reply.thread_no(), Some(100));
    }

    #[test]
    fn thread_numbers_skips_entries_without_no() {
        let catalog: Vec<CatalogPage> = serde_json::from_str(
            r#"[{"threads": [{"no": 1}, {}, {"no": 3}]}, {"threads": [{"no": 7}]}]"#,
        )
        .unwrap();
        assert_eq!(thread_numbers(&catalog), vec![1, 3, 7]);
    }
}
