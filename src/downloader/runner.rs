// Subprocess execution for the external tools
//
// - `run`: streams stdout+stderr line by line, no time limit (downloads)
// - `run_with_timeout`: captures everything, kills the child on timeout (metadata)

use std::collections::VecDeque;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::errors::DownloadError;
use super::models::ProgressEvent;
use super::progress::ProgressParser;

/// Lines of output kept for error reports
pub const MAX_CAPTURED_LINES: usize = 40;

/// Successful run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub line_count: usize,
}

/// Short tool name for messages (`yt-dlp` rather than the full path)
pub fn tool_label(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string())
}

/// Run a tool, reporting every non-empty output line in the order it was read
///
/// Exit code 0 is success; anything else becomes `ToolInvocationFailed` with
/// the last captured lines attached.
pub async fn run<F>(
    program: &Path,
    args: &[String],
    parser: &dyn ProgressParser,
    mut on_line: F,
) -> Result<RunOutcome, DownloadError>
where
    F: FnMut(ProgressEvent),
{
    let tool = tool_label(program);
    debug!("Running {} {}", program.display(), args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DownloadError::ToolInvocationFailed {
            tool: tool.clone(),
            code: None,
            output: format!("Failed to start {}: {}", program.display(), e),
        })?;

    let stdout = child.stdout.take().ok_or_else(|| capture_error(&tool, "stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| capture_error(&tool, "stderr"))?;

    let mut out_lines = BufReader::new(stdout).split(b'\n');
    let mut err_lines = BufReader::new(stderr).split(b'\n');
    let mut out_open = true;
    let mut err_open = true;

    let mut captured: VecDeque<String> = VecDeque::with_capacity(MAX_CAPTURED_LINES);
    let mut line_count = 0usize;

    while out_open || err_open {
        let (segment, from_stdout) = tokio::select! {
            seg = out_lines.next_segment(), if out_open => (seg, true),
            seg = err_lines.next_segment(), if err_open => (seg, false),
        };

        match segment {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if captured.len() == MAX_CAPTURED_LINES {
                    captured.pop_front();
                }
                captured.push_back(line.to_string());
                line_count += 1;
                on_line(parser.parse(line));
            }
            Ok(None) => {
                if from_stdout {
                    out_open = false;
                } else {
                    err_open = false;
                }
            }
            Err(e) => {
                warn!("Reading {} output failed: {}", tool, e);
                if from_stdout {
                    out_open = false;
                } else {
                    err_open = false;
                }
            }
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| DownloadError::ToolInvocationFailed {
            tool: tool.clone(),
            code: None,
            output: format!("Failed to wait for {}: {}", tool, e),
        })?;

    if status.success() {
        debug!("{} exited successfully after {} lines", tool, line_count);
        return Ok(RunOutcome { line_count });
    }

    warn!("{} exited with {:?}", tool, status.code());
    Err(DownloadError::ToolInvocationFailed {
        tool,
        code: status.code(),
        output: captured.into_iter().collect::<Vec<_>>().join("\n"),
    })
}

/// Run a tool to completion with a time limit, capturing stdout and stderr
pub async fn run_with_timeout(
    program: &Path,
    args: &[String],
    timeout_secs: u64,
) -> Result<Output, DownloadError> {
    let tool = tool_label(program);
    debug!("Running {} {} (timeout {}s)", program.display(), args.join(" "), timeout_secs);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DownloadError::ToolInvocationFailed {
            tool: tool.clone(),
            code: None,
            output: format!("Failed to start {}: {}", program.display(), e),
        })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| capture_error(&tool, "stdout"))?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| capture_error(&tool, "stderr"))?;

    let mut stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let mut stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    // Output collection counts against the limit too: a grandchild can keep
    // the pipes open after the tool itself has exited.
    let collected = timeout(Duration::from_secs(timeout_secs), async {
        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::ToolInvocationFailed {
                tool: tool.clone(),
                code: None,
                output: format!("Failed to wait for {}: {}", tool, e),
            })?;
        let stdout = join_capture(&tool, &mut stdout_task).await?;
        let stderr = join_capture(&tool, &mut stderr_task).await?;
        Ok::<_, DownloadError>(Output { status, stdout, stderr })
    })
    .await;

    match collected {
        Ok(result) => result,
        Err(_) => {
            warn!("{} timed out after {}s, killing it", tool, timeout_secs);
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout(timeout_secs))
        }
    }
}

async fn join_capture(
    tool: &str,
    task: &mut tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, DownloadError> {
    let failed = |msg: String| DownloadError::ToolInvocationFailed {
        tool: tool.to_string(),
        code: None,
        output: msg,
    };
    task.await
        .map_err(|e| failed(format!("Output reader failed: {}", e)))?
        .map_err(|e| failed(format!("Failed to read output: {}", e)))
}

fn capture_error(tool: &str, stream: &str) -> DownloadError {
    DownloadError::ToolInvocationFailed {
        tool: tool.to_string(),
        code: None,
        output: format!("Failed to capture {} from {}", stream, tool),
    }
}
