// Progress line parsing
//
// yt-dlp with `--newline` prints lines like:
// [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59
// Anything that carries a percentage counts; everything else is reported as
// unknown progress with the raw line kept for the status label.

use regex::Regex;

use super::models::ProgressEvent;

lazy_static::lazy_static! {
    static ref DECIMAL_PERCENT_RE: Regex = Regex::new(r"(\d{1,3}\.\d+)%").unwrap();
    static ref INTEGER_PERCENT_RE: Regex = Regex::new(r"(\d{1,3})%").unwrap();
}

/// Turns one line of tool output into a progress event
pub trait ProgressParser: Send + Sync {
    fn parse(&self, line: &str) -> ProgressEvent;
}

/// Best-effort percentage scraper
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentLineParser;

impl PercentLineParser {
    fn percent_of(line: &str) -> Option<f32> {
        let caps = DECIMAL_PERCENT_RE
            .captures(line)
            .or_else(|| INTEGER_PERCENT_RE.captures(line))?;
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        (0.0..=100.0).contains(&percent).then_some(percent)
    }
}

impl ProgressParser for PercentLineParser {
    fn parse(&self, line: &str) -> ProgressEvent {
        let line = line.trim();
        match Self::percent_of(line) {
            Some(percent) => ProgressEvent::known(percent, line),
            None => ProgressEvent::unknown(line),
        }
    }
}
