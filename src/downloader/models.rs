// Common data models for the download core

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::errors::DownloadError;

/// Requested video quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Best,
    Worst,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "144p")]
    P144,
}

impl Quality {
    pub const ALL: [Quality; 7] = [
        Quality::Best,
        Quality::Worst,
        Quality::P720,
        Quality::P480,
        Quality::P360,
        Quality::P240,
        Quality::P144,
    ];

    /// Height cap in pixels, `None` for best/worst
    pub fn max_height(&self) -> Option<u32> {
        match self {
            Self::Best | Self::Worst => None,
            Self::P720 => Some(720),
            Self::P480 => Some(480),
            Self::P360 => Some(360),
            Self::P240 => Some(240),
            Self::P144 => Some(144),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Worst => "worst",
            Self::P720 => "720p",
            Self::P480 => "480p",
            Self::P360 => "360p",
            Self::P240 => "240p",
            Self::P144 => "144p",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|q| q.as_str() == token)
            .ok_or_else(|| DownloadError::InvalidInput(format!("Unknown quality: {}", s)))
    }
}

/// Output container requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Webm,
    Mkv,
    Mp3,
    M4a,
}

impl ContainerFormat {
    pub const ALL: [ContainerFormat; 5] = [
        ContainerFormat::Mp4,
        ContainerFormat::Webm,
        ContainerFormat::Mkv,
        ContainerFormat::Mp3,
        ContainerFormat::M4a,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
        }
    }

    /// Audio-only containers need a separate extraction step
    pub fn is_audio_only(&self) -> bool {
        matches!(self, Self::Mp3 | Self::M4a)
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerFormat {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == token)
            .ok_or_else(|| DownloadError::InvalidInput(format!("Unknown format: {}", s)))
    }
}

/// Everything needed to start one download
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub quality: Quality,
    pub container_format: ContainerFormat,
    pub destination_directory: PathBuf,
}

impl DownloadRequest {
    pub fn new(
        url: impl Into<String>,
        quality: Quality,
        container_format: ContainerFormat,
        destination_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            quality,
            container_format,
            destination_directory: destination_directory.into(),
        }
    }
}

/// Display summary of a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub title: String,
    pub uploader: String,
    pub duration_seconds: Option<u64>,
    pub view_count: Option<u64>,
}

impl VideoSummary {
    pub fn duration_display(&self) -> String {
        match self.duration_seconds {
            Some(secs) if secs > 0 => format_duration(secs),
            _ => "Unknown".to_string(),
        }
    }

    pub fn views_display(&self) -> String {
        match self.view_count {
            Some(count) if count > 0 => format_views(count),
            _ => "Unknown views".to_string(),
        }
    }

    /// Multi-line text for the info panel
    pub fn to_display_text(&self) -> String {
        format!(
            "Title: {}\nUploader: {}\nDuration: {}\nViews: {}\n",
            self.title,
            self.uploader,
            self.duration_display(),
            self.views_display()
        )
    }
}

/// `MM:SS`, minutes keep counting past 59
pub fn format_duration(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn format_views(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M views", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K views", count as f64 / 1_000.0)
    } else {
        format!("{} views", count)
    }
}

/// One line of tool output, with a percentage when one could be read
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// `None` means no numeric progress on this line
    pub percent: Option<f32>,
    pub raw_line: String,
}

impl ProgressEvent {
    pub fn known(percent: f32, raw_line: impl Into<String>) -> Self {
        Self {
            percent: Some(percent.clamp(0.0, 100.0)),
            raw_line: raw_line.into(),
        }
    }

    pub fn unknown(raw_line: impl Into<String>) -> Self {
        Self {
            percent: None,
            raw_line: raw_line.into(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.percent.is_none()
    }
}

/// Resolved tools for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLocation {
    pub executable_path: PathBuf,
    /// Directory holding ffmpeg, passed as `--ffmpeg-location`
    pub auxiliary_tool_directory: Option<PathBuf>,
}

/// Download state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadPhase {
    #[default]
    Idle,
    Validating,
    Resolving,
    Running,
    Completing,
}

impl DownloadPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Messages from workers to the foreground consumer
#[derive(Debug, Clone)]
pub enum AppEvent {
    InfoReady(Result<VideoSummary, String>),
    Progress(ProgressEvent),
    Complete { success: bool, message: String },
}
