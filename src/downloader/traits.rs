// Invocation strategy trait
//
// A backend is one way of invoking yt-dlp (native binary, Python module).
// All of them speak the same command line, so fetching and downloading are
// provided here and backends only describe how to start the tool.

use async_trait::async_trait;
use std::path::PathBuf;

use super::errors::DownloadError;
use super::info::parse_summary;
use super::models::{ProgressEvent, VideoSummary};
use super::progress::ProgressParser;
use super::runner::{self, RunOutcome};

/// Program plus the arguments that precede yt-dlp's own options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub base_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    /// Base args followed by `extra`
    pub fn args_with(&self, extra: &[String]) -> Vec<String> {
        self.base_args.iter().chain(extra.iter()).cloned().collect()
    }
}

/// Arguments for a metadata-only run
pub fn info_args(url: &str) -> Vec<String> {
    vec![
        "-j".to_string(),
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        url.to_string(),
    ]
}

#[async_trait]
pub trait DownloaderBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// How to start the tool; `ToolNotFound` when this backend can't be used
    fn command(&self) -> Result<ToolCommand, DownloadError>;

    fn is_available(&self) -> bool {
        self.command().is_ok()
    }

    /// Metadata-only invocation, bounded by `timeout_secs`
    async fn fetch_info(&self, url: &str, timeout_secs: u64) -> Result<VideoSummary, DownloadError> {
        let command = self.command()?;
        let output =
            runner::run_with_timeout(&command.program, &command.args_with(&info_args(url)), timeout_secs)
                .await?;

        if !output.status.success() {
            return Err(DownloadError::ToolInvocationFailed {
                tool: self.name().to_string(),
                code: output.status.code(),
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_summary(&output.stdout)
    }

    /// Download with already-built yt-dlp arguments, streaming progress
    async fn download(
        &self,
        command: &ToolCommand,
        args: &[String],
        parser: &dyn ProgressParser,
        on_line: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<RunOutcome, DownloadError> {
        runner::run(&command.program, &command.args_with(args), parser, on_line).await
    }
}
