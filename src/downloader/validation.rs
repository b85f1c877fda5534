// URL pre-filter for video-hosting links
//
// Syntactic only: a URL that passes may still point at a missing or private
// video, which is discovered when yt-dlp runs.

use regex::Regex;

lazy_static::lazy_static! {
    static ref VIDEO_URL_RE: Regex = Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube|youtu|youtube-nocookie)\.(?:com|be)/(?:watch\?v=|embed/|v/|shorts/|.*[?&]v=)?([^&=%?/\s]{11})"
    ).unwrap();
}

/// Check if a string looks like a video URL with an 11-character id
pub fn is_valid_url(url: &str) -> bool {
    video_id(url).is_some()
}

/// Extract the 11-character video id
pub fn video_id(url: &str) -> Option<&str> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    VIDEO_URL_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
