// Video metadata: `yt-dlp -j` JSON into a VideoSummary

use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::backends::BackendChain;
use super::errors::DownloadError;
use super::models::VideoSummary;
use super::validation;

/// Subset of yt-dlp's info dict we display
#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    view_count: Option<f64>,
}

/// Parse the JSON line out of `-j` output
///
/// yt-dlp can print warnings before the JSON, so the last line that looks
/// like an object is used.
pub fn parse_summary(stdout: &[u8]) -> Result<VideoSummary, DownloadError> {
    let text = String::from_utf8_lossy(stdout);
    let json_line = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| DownloadError::InfoUnavailable("no JSON in tool output".to_string()))?;

    let raw: RawInfo = serde_json::from_str(json_line)
        .map_err(|e| DownloadError::InfoUnavailable(format!("Failed to parse JSON: {}", e)))?;

    Ok(VideoSummary {
        title: non_empty_or_unknown(raw.title),
        uploader: non_empty_or_unknown(raw.uploader),
        duration_seconds: non_negative(raw.duration),
        view_count: non_negative(raw.view_count),
    })
}

/// Whole part of a finite, non-negative number
fn non_negative(value: Option<f64>) -> Option<u64> {
    value.filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)
}

fn non_empty_or_unknown(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

pub struct InfoFetcher {
    backends: Arc<BackendChain>,
    timeout_secs: u64,
}

impl InfoFetcher {
    pub fn new(backends: Arc<BackendChain>, timeout_secs: u64) -> Self {
        Self {
            backends,
            timeout_secs,
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<VideoSummary, DownloadError> {
        let url = url.trim();
        if !validation::is_valid_url(url) {
            return Err(DownloadError::InvalidInput(format!("Invalid video URL: {}", url)));
        }

        debug!("Fetching info for {} (timeout {}s)", url, self.timeout_secs);
        self.backends.fetch_info(url, self.timeout_secs).await
    }
}
