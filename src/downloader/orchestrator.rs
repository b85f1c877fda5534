// Download orchestrator - one download at a time
//
// Idle → Validating → Resolving → Running → Completing → Idle
//
// Validation and tool resolution happen synchronously in `start`, so bad
// input is reported to the caller directly. Everything after that runs on a
// worker task and is reported through AppEvent::Progress / AppEvent::Complete.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backends::BackendChain;
use super::config::DownloaderConfig;
use super::diagnostics;
use super::errors::DownloadError;
use super::events::EventSender;
use super::format_selector::FormatSelection;
use super::info::InfoFetcher;
use super::models::{AppEvent, DownloadPhase, DownloadRequest, ProgressEvent, ToolLocation};
use super::progress::{PercentLineParser, ProgressParser};
use super::tools::ToolLocator;
use super::validation;

pub const COMPLETED_MESSAGE: &str = "Download completed successfully!";

pub struct DownloadOrchestrator {
    config: Arc<DownloaderConfig>,
    locator: Arc<ToolLocator>,
    backends: Arc<BackendChain>,
    info: Arc<InfoFetcher>,
    parser: Arc<dyn ProgressParser>,
    phase: Arc<Mutex<DownloadPhase>>,
}

impl DownloadOrchestrator {
    pub fn new(config: DownloaderConfig) -> Self {
        let locator = ToolLocator::from_config(&config);
        Self::with_locator(config, locator)
    }

    pub fn with_locator(config: DownloaderConfig, locator: ToolLocator) -> Self {
        let config = Arc::new(config);
        let locator = Arc::new(locator);
        let backends = Arc::new(BackendChain::from_config(config.clone(), locator.clone()));
        Self::with_backends(config, locator, backends)
    }

    /// Custom backend ranking
    pub fn with_backends(
        config: Arc<DownloaderConfig>,
        locator: Arc<ToolLocator>,
        backends: Arc<BackendChain>,
    ) -> Self {
        let info = Arc::new(InfoFetcher::new(backends.clone(), config.info_timeout_secs));
        Self {
            config,
            locator,
            backends,
            info,
            parser: Arc::new(PercentLineParser),
            phase: Arc::new(Mutex::new(DownloadPhase::Idle)),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ProgressParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn phase(&self) -> DownloadPhase {
        *lock_phase(&self.phase)
    }

    pub fn is_busy(&self) -> bool {
        !self.phase().is_idle()
    }

    /// Validate, resolve tools and start the download worker
    ///
    /// Must be called from within a tokio runtime. Errors returned here leave
    /// the orchestrator Idle and emit no events.
    pub fn start(
        &self,
        request: DownloadRequest,
        events: EventSender,
    ) -> Result<JoinHandle<()>, DownloadError> {
        let mut guard = PhaseGuard::acquire(self.phase.clone())?;

        validate_request(&request)?;

        guard.advance(DownloadPhase::Resolving);
        let selection = FormatSelection::for_request(&request);
        let (backend, command) = self.backends.first_available()?;
        let location = ToolLocation {
            executable_path: command.program.clone(),
            auxiliary_tool_directory: self.locator.auxiliary_directory(&self.config),
        };
        if location.auxiliary_tool_directory.is_none() {
            warn!("ffmpeg not found; merging and audio conversion may fail");
        }
        debug!("Resolved tools: {:?}", location);

        let args = build_download_args(
            &request,
            &selection,
            &self.config.output_template,
            location.auxiliary_tool_directory.as_deref(),
        );

        guard.advance(DownloadPhase::Running);
        guard.arm(events.clone());
        info!(
            "Starting download of {} with {} ({} / {})",
            request.url.trim(),
            backend.name(),
            request.quality,
            request.container_format
        );

        let parser = self.parser.clone();
        let handle = tokio::spawn(async move {
            let progress_tx = events;
            let mut on_line = |event: ProgressEvent| {
                let _ = progress_tx.send(AppEvent::Progress(event));
            };

            let result = backend
                .download(&command, &args, parser.as_ref(), &mut on_line)
                .await;

            match result {
                Ok(outcome) => {
                    guard.advance(DownloadPhase::Completing);
                    info!("Download finished ({} lines of output)", outcome.line_count);
                    guard.finish(true, COMPLETED_MESSAGE.to_string());
                }
                Err(e) => {
                    let err = DownloadError::download_failed(e);
                    error!("{}", err);
                    guard.finish(false, failure_message(&err));
                }
            }
        });

        Ok(handle)
    }

    /// Fetch metadata on a worker and report it as AppEvent::InfoReady
    ///
    /// Independent of the download state; a fetch may run alongside a download.
    pub fn fetch_info(&self, url: &str, events: EventSender) -> Result<JoinHandle<()>, DownloadError> {
        let url = checked_url(url)?.to_string();
        let fetcher = self.info.clone();

        Ok(tokio::spawn(async move {
            let result = fetcher.fetch(&url).await.map_err(|e| match e {
                already @ DownloadError::InfoUnavailable(_) => already.to_string(),
                other => DownloadError::InfoUnavailable(other.to_string()).to_string(),
            });
            if let Err(message) = &result {
                warn!("{}", message);
            }
            let _ = events.send(AppEvent::InfoReady(result));
        }))
    }
}

fn checked_url(url: &str) -> Result<&str, DownloadError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(DownloadError::InvalidInput("Please enter a video URL".to_string()));
    }
    if !validation::is_valid_url(url) {
        return Err(DownloadError::InvalidInput(format!("Invalid video URL: {}", url)));
    }
    Ok(url)
}

fn validate_request(request: &DownloadRequest) -> Result<(), DownloadError> {
    checked_url(&request.url)?;
    if !request.destination_directory.is_dir() {
        return Err(DownloadError::InvalidDestination(
            request.destination_directory.clone(),
        ));
    }
    Ok(())
}

/// yt-dlp arguments for a download, in invocation order
pub fn build_download_args(
    request: &DownloadRequest,
    selection: &FormatSelection,
    output_template: &str,
    ffmpeg_dir: Option<&Path>,
) -> Vec<String> {
    let mut args = selection.extraction_args();

    args.push("-f".to_string());
    args.push(selection.expression.clone());

    let output: PathBuf = request.destination_directory.join(output_template);
    args.push("-o".to_string());
    args.push(output.to_string_lossy().to_string());

    if let Some(dir) = ffmpeg_dir {
        args.push("--ffmpeg-location".to_string());
        args.push(dir.to_string_lossy().to_string());
    }

    args.push("--newline".to_string());
    args.push("--no-playlist".to_string());
    args.push(request.url.trim().to_string());
    args
}

fn failure_message(err: &DownloadError) -> String {
    let message = err.to_string();
    match err.tool_output().and_then(diagnostics::diagnose) {
        Some(reason) => format!("{}\n{}: {}", message, reason.description(), reason.hint()),
        None => message,
    }
}

fn lock_phase(phase: &Mutex<DownloadPhase>) -> std::sync::MutexGuard<'_, DownloadPhase> {
    phase.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the non-Idle state until the download is over
///
/// Dropping it without `finish` (early return, worker panic) puts the state
/// back to Idle, and reports a failure if the worker had already started.
struct PhaseGuard {
    phase: Arc<Mutex<DownloadPhase>>,
    events: Option<EventSender>,
    finished: bool,
}

impl PhaseGuard {
    fn acquire(phase: Arc<Mutex<DownloadPhase>>) -> Result<Self, DownloadError> {
        {
            let mut current = lock_phase(&phase);
            if !current.is_idle() {
                return Err(DownloadError::AlreadyInProgress);
            }
            *current = DownloadPhase::Validating;
        }
        Ok(Self {
            phase,
            events: None,
            finished: false,
        })
    }

    fn advance(&self, next: DownloadPhase) {
        debug!("Download phase -> {:?}", next);
        *lock_phase(&self.phase) = next;
    }

    fn arm(&mut self, events: EventSender) {
        self.events = Some(events);
    }

    /// Back to Idle, then report
    fn finish(&mut self, success: bool, message: String) {
        *lock_phase(&self.phase) = DownloadPhase::Idle;
        self.finished = true;
        if let Some(events) = self.events.take() {
            let _ = events.send(AppEvent::Complete { success, message });
        }
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        *lock_phase(&self.phase) = DownloadPhase::Idle;
        if let Some(events) = self.events.take() {
            error!("Download worker stopped before completion");
            let _ = events.send(AppEvent::Complete {
                success: false,
                message: DownloadError::download_failed(DownloadError::ToolInvocationFailed {
                    tool: "worker".to_string(),
                    code: None,
                    output: "stopped unexpectedly".to_string(),
                })
                .to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::events::{self, EventReceiver};
    use crate::downloader::models::{ContainerFormat, Quality};

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn drain(mut rx: EventReceiver) -> Vec<AppEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn test_args_video() {
        let request = DownloadRequest::new(URL, Quality::P720, ContainerFormat::Mp4, "/tmp/out");
        let selection = FormatSelection::for_request(&request);
        let args = build_download_args(
            &request,
            &selection,
            "%(title)s.%(ext)s",
            Some(Path::new("/opt/ffmpeg/bin")),
        );

        assert_eq!(
            args,
            vec![
                "-f",
                "best[height<=720][ext=mp4]/best[height<=720]/best",
                "-o",
                "/tmp/out/%(title)s.%(ext)s",
                "--ffmpeg-location",
                "/opt/ffmpeg/bin",
                "--newline",
                "--no-playlist",
                URL,
            ]
        );
        assert_eq!(args.iter().filter(|a| *a == "--ffmpeg-location").count(), 1);
    }

    #[test]
    fn test_args_audio_extraction_first() {
        let request = DownloadRequest::new(URL, Quality::Best, ContainerFormat::Mp3, "/tmp/out");
        let selection = FormatSelection::for_request(&request);
        let args = build_download_args(&request, &selection, "%(title)s.%(ext)s", None);

        assert_eq!(&args[..3], &["--extract-audio", "--audio-format", "mp3"]);
        assert_eq!(args[3], "-f");
        assert!(!args.contains(&"--ffmpeg-location".to_string()));
        assert_eq!(args.last().map(String::as_str), Some(URL));
    }

    #[test]
    fn test_failure_message_with_hint() {
        let err = DownloadError::download_failed(DownloadError::ToolInvocationFailed {
            tool: "yt-dlp".to_string(),
            code: Some(1),
            output: "ERROR: [youtube] dQw4w9WgXcQ: Private video".to_string(),
        });
        let message = failure_message(&err);
        assert!(message.starts_with("Download failed: yt-dlp failed (exit code 1)"));
        assert!(message.contains("Private video: The uploader has made this video private."));
    }

    #[test]
    fn test_guard_resets_phase_on_drop() {
        let phase = Arc::new(Mutex::new(DownloadPhase::Idle));
        let (tx, rx) = events::channel();
        {
            let mut guard = PhaseGuard::acquire(phase.clone()).unwrap();
            guard.advance(DownloadPhase::Running);
            assert!(matches!(
                PhaseGuard::acquire(phase.clone()),
                Err(DownloadError::AlreadyInProgress)
            ));
            guard.arm(tx);
        }
        assert_eq!(*phase.lock().unwrap(), DownloadPhase::Idle);

        let events = drain(rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AppEvent::Complete { success: false, .. }));
    }

    #[test]
    fn test_unarmed_guard_is_silent() {
        let phase = Arc::new(Mutex::new(DownloadPhase::Idle));
        drop(PhaseGuard::acquire(phase.clone()).unwrap());
        assert_eq!(*phase.lock().unwrap(), DownloadPhase::Idle);
    }

    #[cfg(unix)]
    mod with_fake_tool {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        struct Fixture {
            tools: tempfile::TempDir,
            dest: tempfile::TempDir,
            orchestrator: DownloadOrchestrator,
        }

        fn fixture(body: &str) -> Fixture {
            let tools = tempfile::tempdir().unwrap();
            let dest = tempfile::tempdir().unwrap();
            let script = tools.path().join("yt-dlp");
            std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

            let config = DownloaderConfig::default()
                .with_ytdlp_path(Some(script))
                .with_python("/nonexistent/python3");
            let locator = ToolLocator::new(Some(tools.path().to_path_buf())).without_path_search();
            Fixture {
                orchestrator: DownloadOrchestrator::with_locator(config, locator),
                tools,
                dest,
            }
        }

        fn request(dest: &Path) -> DownloadRequest {
            DownloadRequest::new(URL, Quality::Best, ContainerFormat::Mp4, dest)
        }

        #[tokio::test]
        async fn test_successful_download() {
            let fx = fixture(
                "echo '[download] Destination: video.mp4'\necho '[download]  42.5% of 1.00MiB'\necho '[download] 100% of 1.00MiB'",
            );
            let (tx, rx) = events::channel();

            let handle = fx.orchestrator.start(request(fx.dest.path()), tx).unwrap();
            handle.await.unwrap();
            assert_eq!(fx.orchestrator.phase(), DownloadPhase::Idle);

            let events = drain(rx);
            let percents: Vec<Option<f32>> = events
                .iter()
                .filter_map(|e| match e {
                    AppEvent::Progress(p) => Some(p.percent),
                    _ => None,
                })
                .collect();
            assert_eq!(percents, vec![None, Some(42.5), Some(100.0)]);

            match events.last() {
                Some(AppEvent::Complete { success, message }) => {
                    assert!(*success);
                    assert_eq!(message, COMPLETED_MESSAGE);
                }
                other => panic!("unexpected last event: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_tool_receives_args() {
            let fx = fixture("printf '%s\\n' \"$@\" > \"$(dirname \"$0\")/args.txt\"");
            let (tx, _rx) = events::channel();

            fx.orchestrator.start(request(fx.dest.path()), tx).unwrap().await.unwrap();

            let recorded = std::fs::read_to_string(fx.tools.path().join("args.txt")).unwrap();
            let args: Vec<&str> = recorded.lines().collect();
            assert_eq!(args[0], "-f");
            assert_eq!(args[1], "best[ext=mp4]/best");
            assert!(args.contains(&"--newline"));
            assert_eq!(args.last(), Some(&URL));
        }

        #[tokio::test]
        async fn test_second_start_rejected_while_running() {
            let fx = fixture("echo '[download]  10.0% of 1MiB'\nsleep 1");
            let (tx, rx) = events::channel();
            let (rejected_tx, rejected_rx) = events::channel();

            let handle = fx.orchestrator.start(request(fx.dest.path()), tx).unwrap();
            assert!(fx.orchestrator.is_busy());

            let second = fx.orchestrator.start(request(fx.dest.path()), rejected_tx);
            assert!(matches!(second, Err(DownloadError::AlreadyInProgress)));
            assert_eq!(fx.orchestrator.phase(), DownloadPhase::Running);

            handle.await.unwrap();
            assert!(!fx.orchestrator.is_busy());
            assert!(drain(rejected_rx).is_empty());

            let events = drain(rx);
            assert!(matches!(
                events.first(),
                Some(AppEvent::Progress(p)) if p.percent == Some(10.0)
            ));
            let completions: Vec<&AppEvent> = events
                .iter()
                .filter(|e| matches!(e, AppEvent::Complete { .. }))
                .collect();
            assert_eq!(completions.len(), 1);
            assert!(matches!(
                events.last(),
                Some(AppEvent::Complete { success: true, .. })
            ));
        }

        #[tokio::test]
        async fn test_start_does_not_wait_on_fallback_interpreter() {
            let tools = tempfile::tempdir().unwrap();
            let dest = tempfile::tempdir().unwrap();
            let python = tools.path().join("python3");
            std::fs::write(&python, "#!/bin/sh\nsleep 2\nexit 0\n").unwrap();
            std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

            let config = DownloaderConfig::default().with_python(python.to_string_lossy().to_string());
            let locator = ToolLocator::new(Some(tools.path().to_path_buf())).without_path_search();
            let orchestrator = DownloadOrchestrator::with_locator(config, locator);
            let (tx, rx) = events::channel();

            let started = std::time::Instant::now();
            let handle = orchestrator.start(request(dest.path()), tx).unwrap();
            assert!(started.elapsed() < std::time::Duration::from_millis(500));
            assert_eq!(orchestrator.phase(), DownloadPhase::Running);

            handle.await.unwrap();
            assert!(matches!(
                drain(rx).last(),
                Some(AppEvent::Complete { success: true, .. })
            ));
        }

        #[tokio::test]
        async fn test_custom_parser() {
            struct Halves;

            impl ProgressParser for Halves {
                fn parse(&self, line: &str) -> ProgressEvent {
                    ProgressEvent::known(50.0, line)
                }
            }

            let fx = fixture("echo 'step one'\necho 'step two'");
            let orchestrator = fx.orchestrator.with_parser(Arc::new(Halves));
            let (tx, rx) = events::channel();

            orchestrator.start(request(fx.dest.path()), tx).unwrap().await.unwrap();

            let percents: Vec<Option<f32>> = drain(rx)
                .iter()
                .filter_map(|e| match e {
                    AppEvent::Progress(p) => Some(p.percent),
                    _ => None,
                })
                .collect();
            assert_eq!(percents, vec![Some(50.0), Some(50.0)]);
        }

        #[tokio::test]
        async fn test_failed_download_reports_and_resets() {
            let fx = fixture("echo 'ERROR: [youtube] dQw4w9WgXcQ: Video unavailable' >&2\nexit 1");
            let (tx, rx) = events::channel();

            fx.orchestrator.start(request(fx.dest.path()), tx).unwrap().await.unwrap();
            assert_eq!(fx.orchestrator.phase(), DownloadPhase::Idle);

            match drain(rx).last() {
                Some(AppEvent::Complete { success, message }) => {
                    assert!(!*success);
                    assert!(message.starts_with("Download failed:"));
                    assert!(message.contains("Video unavailable"));
                }
                other => panic!("unexpected last event: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_crashed_tool_is_failure() {
            let fx = fixture("kill -9 $$");
            let (tx, rx) = events::channel();

            fx.orchestrator.start(request(fx.dest.path()), tx).unwrap().await.unwrap();
            assert!(!fx.orchestrator.is_busy());
            assert!(matches!(
                drain(rx).last(),
                Some(AppEvent::Complete { success: false, .. })
            ));
        }

        #[tokio::test]
        async fn test_invalid_url_rejected() {
            let fx = fixture("exit 0");
            let (tx, rx) = events::channel();

            let mut req = request(fx.dest.path());
            req.url = "https://example.com/watch".to_string();
            assert!(matches!(
                fx.orchestrator.start(req.clone(), tx.clone()),
                Err(DownloadError::InvalidInput(_))
            ));

            req.url = "   ".to_string();
            assert!(matches!(
                fx.orchestrator.start(req, tx),
                Err(DownloadError::InvalidInput(_))
            ));

            assert_eq!(fx.orchestrator.phase(), DownloadPhase::Idle);
            assert!(drain(rx).is_empty());
        }

        #[tokio::test]
        async fn test_missing_destination_rejected() {
            let fx = fixture("exit 0");
            let (tx, _rx) = events::channel();

            let missing = fx.dest.path().join("does-not-exist");
            let err = fx.orchestrator.start(request(&missing), tx).unwrap_err();
            assert!(matches!(err, DownloadError::InvalidDestination(p) if p == missing));
            assert!(!fx.orchestrator.is_busy());
        }

        #[tokio::test]
        async fn test_missing_tool_rejected() {
            let empty = tempfile::tempdir().unwrap();
            let dest = tempfile::tempdir().unwrap();
            let config = DownloaderConfig::default().with_python("/nonexistent/python3");
            let locator = ToolLocator::new(Some(empty.path().to_path_buf())).without_path_search();
            let orchestrator = DownloadOrchestrator::with_locator(config, locator);
            let (tx, _rx) = events::channel();

            let err = orchestrator.start(request(dest.path()), tx).unwrap_err();
            assert!(matches!(err, DownloadError::ToolNotFound(_)));
            assert_eq!(orchestrator.phase(), DownloadPhase::Idle);
        }

        #[tokio::test]
        async fn test_fetch_info_event() {
            let fx = fixture("echo '{\"title\": \"Clip\", \"uploader\": \"Someone\", \"duration\": 125, \"view_count\": 999}'");
            let (tx, rx) = events::channel();

            fx.orchestrator.fetch_info(URL, tx).unwrap().await.unwrap();

            match drain(rx).pop() {
                Some(AppEvent::InfoReady(Ok(summary))) => {
                    assert_eq!(
                        summary.to_display_text(),
                        "Title: Clip\nUploader: Someone\nDuration: 02:05\nViews: 999 views\n"
                    );
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_fetch_info_failure_event() {
            let fx = fixture("echo 'ERROR: Private video' >&2\nexit 1");
            let (tx, rx) = events::channel();

            fx.orchestrator.fetch_info(URL, tx).unwrap().await.unwrap();

            match drain(rx).pop() {
                Some(AppEvent::InfoReady(Err(message))) => {
                    assert!(message.starts_with("Error getting video information:"));
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_fetch_info_rejects_bad_url() {
            let fx = fixture("exit 0");
            let (tx, _rx) = events::channel();
            assert!(matches!(
                fx.orchestrator.fetch_info("not a url", tx),
                Err(DownloadError::InvalidInput(_))
            ));
        }
    }
}
