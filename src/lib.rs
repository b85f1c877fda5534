pub mod downloader;

pub use downloader::{
    AppEvent, ContainerFormat, DownloadError, DownloadOrchestrator, DownloadRequest,
    DownloaderConfig, Presenter, ProgressEvent, Quality, VideoSummary,
};

/// Log to stderr; RUST_LOG overrides the default filter
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "video_downloader=info".into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
