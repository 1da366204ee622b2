use serde::{Deserialize, Serialize};

/// Which upstream site a piece of content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Chan,
    Reddit,
}

impl Platform {
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Chan => "4chan",
            Platform::Reddit => "Reddit",
        }
    }
}

/// Media composition of a content item. Stored as denormalized JSON on
/// sentiment score rows for downstream media-type analytics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFlags {
    pub text: bool,
    pub image: bool,
    pub video: bool,
}

impl MediaFlags {
    /// Human label used by the media-metrics aggregation, mirroring the
    /// dashboard's derived_media_type buckets.
    pub fn label(&self) -> Option<&'static str> {
        match (self.text, self.image, self.video) {
            (true, false, false) => Some("Text Only"),
            (false, true, false) => Some("Image Only"),
            (false, false, true) => Some("Video Only"),
            (true, true, _) => Some("Text + Image"),
            (true, false, true) => Some("Text + Video"),
            _ => None,
        }
    }
}
