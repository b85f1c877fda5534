// Runtime configuration
//
// Defaults, then <config_dir>/video-downloader/config.json, then env overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::models::{ContainerFormat, Quality};

pub const CONFIG_DIR_NAME: &str = "video-downloader";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
pub const DEFAULT_INFO_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Explicit yt-dlp executable (skips lookup)
    pub ytdlp_path: Option<PathBuf>,
    /// Explicit ffmpeg executable or the directory containing it
    pub ffmpeg_path: Option<PathBuf>,
    /// Searched before PATH; defaults to the running executable's directory
    pub bundle_dir: Option<PathBuf>,
    /// Interpreter used for `python -m yt_dlp`
    pub python: String,
    pub info_timeout_secs: u64,
    pub output_template: String,
    pub quality: Quality,
    pub format: ContainerFormat,
    pub output_dir: PathBuf,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            bundle_dir: None,
            python: "python3".to_string(),
            info_timeout_secs: DEFAULT_INFO_TIMEOUT_SECS,
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            quality: Quality::Best,
            format: ContainerFormat::Mp4,
            output_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

impl DownloaderConfig {
    /// Load from the user config file (if any) and apply env overrides
    pub fn load() -> Self {
        let mut config = Self::default_path()
            .and_then(|path| Self::from_file(&path))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Missing or malformed files yield `None`
    pub fn from_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<Self>(&content) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                warn!("Ignoring malformed config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Env lookup is injected so tests don't touch the process environment
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty("VIDEO_DL_YTDLP") {
            self.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Some(path) = non_empty("VIDEO_DL_FFMPEG") {
            self.ffmpeg_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = non_empty("VIDEO_DL_BUNDLE_DIR") {
            self.bundle_dir = Some(PathBuf::from(dir));
        }
        if let Some(python) = non_empty("YTDLP_PYTHON") {
            self.python = python;
        }
        if let Some(secs) = non_empty("VIDEO_DL_INFO_TIMEOUT") {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.info_timeout_secs = secs,
                _ => warn!("Ignoring invalid VIDEO_DL_INFO_TIMEOUT={}", secs),
            }
        }
    }

    /// Bundle directory, falling back to the running executable's directory
    pub fn effective_bundle_dir(&self) -> Option<PathBuf> {
        self.bundle_dir.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        })
    }

    pub fn with_ytdlp_path(mut self, path: Option<PathBuf>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_ffmpeg_path(mut self, path: Option<PathBuf>) -> Self {
        self.ffmpeg_path = path;
        self
    }

    pub fn with_bundle_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.bundle_dir = dir;
        self
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DownloaderConfig::default();
        assert_eq!(config.python, "python3");
        assert_eq!(config.info_timeout_secs, 30);
        assert_eq!(config.output_template, "%(title)s.%(ext)s");
        assert_eq!(config.quality, Quality::Best);
        assert_eq!(config.format, ContainerFormat::Mp4);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VIDEO_DL_YTDLP", "/opt/tools/yt-dlp"),
            ("YTDLP_PYTHON", "/venv/bin/python"),
            ("VIDEO_DL_INFO_TIMEOUT", "12"),
            ("VIDEO_DL_FFMPEG", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = DownloaderConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.ytdlp_path, Some(PathBuf::from("/opt/tools/yt-dlp")));
        assert_eq!(config.python, "/venv/bin/python");
        assert_eq!(config.info_timeout_secs, 12);
        assert_eq!(config.ffmpeg_path, None);
    }

    #[test]
    fn test_invalid_timeout_ignored() {
        let mut config = DownloaderConfig::default();
        config.apply_env(|key| (key == "VIDEO_DL_INFO_TIMEOUT").then(|| "soon".to_string()));
        assert_eq!(config.info_timeout_secs, DEFAULT_INFO_TIMEOUT_SECS);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "quality": "480p", "python": "py" }"#).unwrap();

        let config = DownloaderConfig::from_file(&path).unwrap();
        assert_eq!(config.quality, Quality::P480);
        assert_eq!(config.python, "py");
        assert_eq!(config.info_timeout_secs, 30);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(DownloaderConfig::from_file(&path).is_none());
    }
}
