use moodwire_common::MediaFlags;
use reddit_client::Submission;

const IMAGE_SUFFIXES: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];
const VIDEO_SUFFIXES: [&str; 3] = [".mp4", ".webm", ".mov"];
const VIDEO_DOMAINS: [&str; 4] = ["youtube.com", "youtu.be", "vimeo.com", "v.redd.it"];

/// Derive the media composition of a submission from a fixed precedence of
/// payload fields: explicit flags, known domains, URL suffix heuristics,
/// preview/gallery metadata. Best effort; missing or malformed fields just
/// leave their flag false.
pub fn media_flags(submission: &Submission) -> MediaFlags {
    let url = submission.url.to_lowercase();

    let text = !submission.selftext.trim().is_empty()
        || submission.is_self
        || submission
            .selftext_html
            .as_deref()
            .is_some_and(|h| !h.trim().is_empty())
        || !submission.title.trim().is_empty();

    let media_type = submission
        .media
        .as_ref()
        .and_then(|m| m.get("type"))
        .and_then(|t| t.as_str());

    let video = submission.is_video
        || media_type == Some("youtube.com")
        || matches!(
            submission.post_hint.as_deref(),
            Some("rich:video") | Some("hosted:video")
        )
        || submission.domain == "v.redd.it"
        || VIDEO_DOMAINS.iter().any(|d| url_domain_matches(&url, d))
        || VIDEO_SUFFIXES.iter().any(|s| url.ends_with(s));

    let has_preview_images = submission
        .preview
        .as_ref()
        .and_then(|p| p.get("images"))
        .and_then(|i| i.as_array())
        .is_some_and(|a| !a.is_empty());

    let has_gallery = submission
        .gallery_data
        .as_ref()
        .is_some_and(|g| !g.is_null())
        || submission
            .media_metadata
            .as_ref()
            .is_some_and(|m| !m.is_null());

    let image = submission.post_hint.as_deref() == Some("image")
        || submission.domain == "i.redd.it"
        || IMAGE_SUFFIXES.iter().any(|s| url.ends_with(s))
        || has_preview_images
        || has_gallery;

    MediaFlags { text, image, video }
}

fn url_domain_matches(url: &str, domain: &str) -> bool {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .map(|rest| {
            let host = rest.split('/').next().unwrap_or("");
            host == domain || host.ends_with(&format!(".{domain}"))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn self_post_is_text_only() {
        let sub = Submission {
            title: "a question".to_string(),
            selftext: "some body".to_string(),
            is_self: true,
            ..Default::default()
        };
        let flags = media_flags(&sub);
        assert!(flags.text);
        assert!(!flags.image);
        assert!(!flags.video);
    }

    #[test]
    fn image_domain_and_suffix_both_count() {
        let by_domain = Submission {
            title: "pic".to_string(),
            domain: "i.redd.it".to_string(),
            ..Default::default()
        };
        assert!(media_flags(&by_domain).image);

        let by_suffix = Submission {
            title: "pic".to_string(),
            url: "https://example.com/photo.PNG".to_string(),
            ..Default::default()
        };
        assert!(media_flags(&by_suffix).image);
    }

    #[test]
    fn video_detected_from_hint_domain_and_media_type() {
        let hinted = Submission {
            title: "clip".to_string(),
            post_hint: Some("hosted:video".to_string()),
            ..Default::default()
        };
        assert!(media_flags(&hinted).video);

        let youtube = Submission {
            title: "clip".to_string(),
            url: "https://www.youtube.com/watch?v=x".to_string(),
            ..Default::default()
        };
        assert!(media_flags(&youtube).video);

        let embedded = Submission {
            title: "clip".to_string(),
            media: Some(json!({"type": "youtube.com"})),
            ..Default::default()
        };
        assert!(media_flags(&embedded).video);
    }

    #[test]
    fn gallery_metadata_marks_image() {
        let sub = Submission {
            title: "album".to_string(),
            media_metadata: Some(json!({"abc": {"status": "valid"}})),
            ..Default::default()
        };
        assert!(media_flags(&sub).image);
    }

    #[test]
    fn default_submission_has_no_flags_beyond_title() {
        let flags = media_flags(&Submission::default());
        assert!(!flags.text);
        assert!(!flags.image);
        assert!(!flags.video);
    }
}
