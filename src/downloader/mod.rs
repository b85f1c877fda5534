// Downloader module - everything between the user's request and yt-dlp

pub mod backends;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod events;
pub mod format_selector;
pub mod info;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod tools;
pub mod traits;
pub mod validation;

pub use backends::BackendChain;
pub use config::DownloaderConfig;
pub use errors::DownloadError;
pub use events::{channel, run_event_loop, EventReceiver, EventSender, Presenter};
pub use format_selector::{FormatSelection, FormatSelector};
pub use info::InfoFetcher;
pub use models::{
    AppEvent, ContainerFormat, DownloadPhase, DownloadRequest, ProgressEvent, Quality,
    ToolLocation, VideoSummary,
};
pub use orchestrator::DownloadOrchestrator;
pub use progress::{PercentLineParser, ProgressParser};
pub use tools::{ToolLocator, ToolType};
pub use traits::{DownloaderBackend, ToolCommand};
