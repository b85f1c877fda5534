// Tool lookup for yt-dlp and ffmpeg
//
// Search order:
// 1. the bundle directory (next to the application)
// 2. a subdirectory of the bundle named after the tool, recursively
// 3. PATH

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::config::DownloaderConfig;
use super::models::ToolLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    /// File names accepted for this tool
    pub fn binary_names(&self) -> [String; 2] {
        let name = self.as_str();
        [name.to_string(), format!("{}.exe", name)]
    }
}

pub struct ToolLocator {
    bundle_dir: Option<PathBuf>,
    search_path: bool,
}

impl ToolLocator {
    pub fn new(bundle_dir: Option<PathBuf>) -> Self {
        Self {
            bundle_dir,
            search_path: true,
        }
    }

    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(config.effective_bundle_dir())
    }

    /// Restrict lookup to the bundle directory
    pub fn without_path_search(mut self) -> Self {
        self.search_path = false;
        self
    }

    /// Find an executable for the tool; `None` means fall back, not fail
    pub fn locate(&self, tool: ToolType) -> Option<PathBuf> {
        let names = tool.binary_names();

        if let Some(bundle) = &self.bundle_dir {
            for name in &names {
                let candidate = bundle.join(name);
                if is_executable_file(&candidate) {
                    debug!("Found bundled {} at {}", tool.as_str(), candidate.display());
                    return Some(candidate);
                }
            }

            let subdir = bundle.join(tool.as_str());
            if subdir.is_dir() {
                if let Some(found) = find_in_tree(&subdir, &names) {
                    debug!("Found {} in bundle subdirectory: {}", tool.as_str(), found.display());
                    return Some(found);
                }
            }
        }

        if self.search_path {
            for name in &names {
                if let Ok(found) = which::which(name) {
                    if is_executable_file(&found) {
                        debug!("Found {} on PATH: {}", tool.as_str(), found.display());
                        return Some(found);
                    }
                }
            }
        }

        debug!("{} not found", tool.as_str());
        None
    }

    /// Directory containing ffmpeg, as yt-dlp's `--ffmpeg-location` wants it
    pub fn ffmpeg_directory(&self) -> Option<PathBuf> {
        self.locate(ToolType::Ffmpeg)
            .and_then(|path| path.parent().map(Path::to_path_buf))
    }

    /// Resolve yt-dlp and ffmpeg, honouring explicit config paths
    pub fn resolve(&self, config: &DownloaderConfig) -> Option<ToolLocation> {
        let executable_path = match &config.ytdlp_path {
            Some(path) if is_executable_file(path) => path.clone(),
            Some(path) => {
                debug!("Configured yt-dlp {} is not executable, searching", path.display());
                self.locate(ToolType::YtDlp)?
            }
            None => self.locate(ToolType::YtDlp)?,
        };

        Some(ToolLocation {
            executable_path,
            auxiliary_tool_directory: self.auxiliary_directory(config),
        })
    }

    /// ffmpeg directory from config (file or dir) or lookup
    pub fn auxiliary_directory(&self, config: &DownloaderConfig) -> Option<PathBuf> {
        match &config.ffmpeg_path {
            Some(path) if path.is_dir() => Some(path.clone()),
            Some(path) if is_executable_file(path) => path.parent().map(Path::to_path_buf),
            _ => self.ffmpeg_directory(),
        }
    }
}

fn find_in_tree(root: &Path, names: &[String]) -> Option<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map_or(false, |n| names.iter().any(|name| name == n))
        })
        .map(|entry| entry.into_path())
        .find(|path| is_executable_file(path))
}

/// Regular file with an execute bit (any file on non-unix targets)
pub fn is_executable_file(path: &Path) -> bool {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return false,
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}
