// Error types for the download core

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Empty or malformed URL, or an unknown quality/format token
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Destination directory does not exist
    #[error("Download folder does not exist: {}", .0.display())]
    InvalidDestination(PathBuf),

    /// A download is already running
    #[error("Download already in progress")]
    AlreadyInProgress,

    /// Neither a bundled nor a PATH executable could be used
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The external tool could not be started or exited non-zero
    #[error("{tool} failed{}{}", exit_suffix(.code), output_suffix(.output))]
    ToolInvocationFailed {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    /// Metadata invocation exceeded its time limit
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Metadata could not be fetched or parsed
    #[error("Error getting video information: {0}")]
    InfoUnavailable(String),

    /// Anything that went wrong while a download was running
    #[error("Download failed: {0}")]
    DownloadFailed(Box<DownloadError>),
}

impl DownloadError {
    pub fn download_failed(cause: DownloadError) -> Self {
        match cause {
            already @ Self::DownloadFailed(_) => already,
            other => Self::DownloadFailed(Box::new(other)),
        }
    }

    /// Captured tool output, if this error carries any
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::ToolInvocationFailed { output, .. } => Some(output.as_str()),
            Self::DownloadFailed(inner) => inner.tool_output(),
            _ => None,
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}

fn output_suffix(output: &str) -> String {
    let last = output.lines().rev().find(|l| !l.trim().is_empty());
    match last {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}
