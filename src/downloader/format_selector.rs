// FormatSelector - maps the user's quality/container choice to yt-dlp input
//
// Produces:
// - a format expression for `-f` (yt-dlp's own selection language)
// - an optional audio extraction step for audio-only containers
//
// The extraction step is kept separate from the expression: yt-dlp selects
// the stream with `-f` and transcodes it afterwards with `-x`.

use super::models::{ContainerFormat, DownloadRequest, Quality};

/// Format expression plus optional post-processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection {
    /// Value for `-f`
    pub expression: String,
    /// Codec for `--extract-audio --audio-format`
    pub audio_extraction: Option<&'static str>,
}

impl FormatSelection {
    pub fn new(quality: Quality, container: ContainerFormat) -> Self {
        Self {
            expression: FormatSelector::build_format_expression(quality, container),
            audio_extraction: FormatSelector::audio_extraction(container),
        }
    }

    pub fn for_request(request: &DownloadRequest) -> Self {
        Self::new(request.quality, request.container_format)
    }

    /// Arguments in the order yt-dlp expects them before `-f`
    pub fn extraction_args(&self) -> Vec<String> {
        match self.audio_extraction {
            Some(codec) => vec![
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                codec.to_string(),
            ],
            None => Vec::new(),
        }
    }
}

pub struct FormatSelector;

impl FormatSelector {
    /// Build the `-f` expression
    ///
    /// - best: best matching container, else best of any container
    /// - worst: worst matching container, else worst overall
    /// - resolution: best at or below the height with the container, then
    ///   the same height cap without it, then unconstrained best
    /// - audio-only container: best audio, whatever the quality
    pub fn build_format_expression(quality: Quality, container: ContainerFormat) -> String {
        if container.is_audio_only() {
            return "bestaudio/best".to_string();
        }

        let ext = container.as_str();
        match (quality, quality.max_height()) {
            (Quality::Best, _) => format!("best[ext={}]/best", ext),
            (Quality::Worst, _) => format!("worst[ext={}]/worst", ext),
            (_, Some(height)) => format!(
                "best[height<={h}][ext={ext}]/best[height<={h}]/best",
                h = height,
                ext = ext
            ),
            (_, None) => format!("best[ext={}]/best", ext),
        }
    }

    /// Codec for the separate extraction step, if the container needs one
    pub fn audio_extraction(container: ContainerFormat) -> Option<&'static str> {
        if container.is_audio_only() {
            Some(container.as_str())
        } else {
            None
        }
    }
}
