// Python backend - `python3 -m yt_dlp`
//
// Used when no yt-dlp executable can be found. The interpreter can be
// overridden with YTDLP_PYTHON (e.g. a venv). Only the interpreter is looked
// up here; a missing yt_dlp module shows up when the tool runs
// ("No module named yt_dlp") and is reported like any other tool failure.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::downloader::errors::DownloadError;
use crate::downloader::traits::{DownloaderBackend, ToolCommand};

pub struct PythonYtDlp {
    python: String,
}

impl PythonYtDlp {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    /// Interpreter path, from PATH or as given
    fn interpreter(&self) -> Option<PathBuf> {
        match which::which(&self.python) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Python interpreter {} not found: {}", self.python, e);
                None
            }
        }
    }
}

#[async_trait]
impl DownloaderBackend for PythonYtDlp {
    fn name(&self) -> &'static str {
        "yt-dlp-python"
    }

    fn command(&self) -> Result<ToolCommand, DownloadError> {
        let python = self.interpreter().ok_or_else(|| {
            DownloadError::ToolNotFound(format!("Python interpreter ({})", self.python))
        })?;
        Ok(ToolCommand::new(python)
            .with_base_args(vec!["-m".to_string(), "yt_dlp".to_string()]))
    }
}
