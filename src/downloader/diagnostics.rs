// Failure diagnostics - turns yt-dlp error output into a short hint
//
// Matching is case-insensitive and substring based; the first matching
// reason in declaration order wins.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    PrivateVideo,
    VideoUnavailable,
    GeoBlocked,
    NetworkTimeout,
    FormatUnavailable,
    ConverterMissing,
    UnsupportedUrl,
    ModuleMissing,
}

impl FailureReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout",
            Self::FormatUnavailable => "Requested format not available",
            Self::ConverterMissing => "ffmpeg not found",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::ModuleMissing => "yt-dlp not installed",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::PrivateVideo => "The uploader has made this video private.",
            Self::VideoUnavailable => {
                "The video may have been deleted or removed. Check the URL."
            }
            Self::GeoBlocked => "The video is not available in your country.",
            Self::NetworkTimeout => "Check your internet connection and try again.",
            Self::FormatUnavailable => "Try a different quality or format.",
            Self::ConverterMissing => {
                "Install ffmpeg or place it next to the application to merge or convert media."
            }
            Self::UnsupportedUrl => "Only video page links are supported.",
            Self::ModuleMissing => "Install yt-dlp: pip3 install yt-dlp",
        }
    }

    fn patterns(&self) -> &'static [&'static str] {
        match self {
            Self::PrivateVideo => &["private video"],
            Self::VideoUnavailable => &["video unavailable", "this video has been removed", "not available anymore"],
            Self::GeoBlocked => &["available in your country", "geo restriction", "geo-restricted"],
            Self::NetworkTimeout => &["timed out", "timeout", "connection reset", "temporary failure in name resolution"],
            Self::FormatUnavailable => &["requested format is not available"],
            Self::ConverterMissing => &["ffmpeg not found", "ffprobe and ffmpeg not found", "ffmpeg is not installed"],
            Self::UnsupportedUrl => &["unsupported url"],
            Self::ModuleMissing => &["no module named yt_dlp"],
        }
    }

    const ALL: [FailureReason; 8] = [
        Self::PrivateVideo,
        Self::VideoUnavailable,
        Self::GeoBlocked,
        Self::NetworkTimeout,
        Self::FormatUnavailable,
        Self::ConverterMissing,
        Self::UnsupportedUrl,
        Self::ModuleMissing,
    ];
}

/// Classify tool output
pub fn diagnose(output: &str) -> Option<FailureReason> {
    let lower = output.to_lowercase();
    FailureReason::ALL
        .iter()
        .copied()
        .find(|reason| reason.patterns().iter().any(|p| lower.contains(p)))
}
