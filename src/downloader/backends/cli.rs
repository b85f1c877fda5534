// CLI backend - native `yt-dlp` executable
//
// Located through ToolLocator: explicit config path, bundle directory,
// bundle subdirectory, then PATH.

use async_trait::async_trait;
use std::sync::Arc;

use crate::downloader::config::DownloaderConfig;
use crate::downloader::errors::DownloadError;
use crate::downloader::tools::{ToolLocator, ToolType};
use crate::downloader::traits::{DownloaderBackend, ToolCommand};

pub struct CliYtDlp {
    config: Arc<DownloaderConfig>,
    locator: Arc<ToolLocator>,
}

impl CliYtDlp {
    pub fn new(config: Arc<DownloaderConfig>, locator: Arc<ToolLocator>) -> Self {
        Self { config, locator }
    }
}

#[async_trait]
impl DownloaderBackend for CliYtDlp {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn command(&self) -> Result<ToolCommand, DownloadError> {
        self.locator
            .resolve(&self.config)
            .map(|location| ToolCommand::new(location.executable_path))
            .ok_or_else(|| {
                DownloadError::ToolNotFound(format!(
                    "{} executable (bundled or on PATH)",
                    ToolType::YtDlp.as_str()
                ))
            })
    }
}
