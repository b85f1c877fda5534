// Invocation strategies and the ranked chain over them
//
// Rank order: native yt-dlp executable, then `python -m yt_dlp`.

pub mod cli;
pub mod python;

pub use cli::CliYtDlp;
pub use python::PythonYtDlp;

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::DownloaderConfig;
use super::errors::DownloadError;
use super::models::VideoSummary;
use super::tools::ToolLocator;
use super::traits::{DownloaderBackend, ToolCommand};

pub struct BackendChain {
    backends: Vec<Arc<dyn DownloaderBackend>>,
}

impl BackendChain {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn add_backend(&mut self, backend: Arc<dyn DownloaderBackend>) {
        self.backends.push(backend);
    }

    /// Default ranking for a config
    pub fn from_config(config: Arc<DownloaderConfig>, locator: Arc<ToolLocator>) -> Self {
        let mut chain = Self::new();
        chain.add_backend(Arc::new(CliYtDlp::new(config.clone(), locator)));
        chain.add_backend(Arc::new(PythonYtDlp::new(config.python.clone())));
        chain
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Highest ranked backend that can be started right now
    pub fn first_available(&self) -> Result<(Arc<dyn DownloaderBackend>, ToolCommand), DownloadError> {
        let mut failures = Vec::new();

        for backend in &self.backends {
            match backend.command() {
                Ok(command) => {
                    debug!("Using backend {}: {}", backend.name(), command.program.display());
                    return Ok((backend.clone(), command));
                }
                Err(e) => {
                    debug!("Backend {} unavailable: {}", backend.name(), e);
                    failures.push(format!("{}: {}", backend.name(), e));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no backends configured".to_string());
        }
        Err(DownloadError::ToolNotFound(failures.join("; ")))
    }

    /// Metadata from the first backend that succeeds
    pub async fn fetch_info(&self, url: &str, timeout_secs: u64) -> Result<VideoSummary, DownloadError> {
        let mut failures = Vec::new();

        for backend in &self.backends {
            debug!("Fetching info with {}", backend.name());

            match backend.fetch_info(url, timeout_secs).await {
                Ok(summary) => {
                    info!("Got info for {} via {}", url, backend.name());
                    return Ok(summary);
                }
                Err(e) => {
                    warn!("{} info fetch failed: {}", backend.name(), e);
                    failures.push(format!("{}: {}", backend.name(), e));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no backends configured".to_string());
        }
        Err(DownloadError::InfoUnavailable(failures.join("; ")))
    }
}

impl Default for BackendChain {
    fn default() -> Self {
        Self::new()
    }
}
