use std::env;
use std::io::Write;
use std::path::PathBuf;

use video_downloader::downloader::events::{channel, run_event_loop};
use video_downloader::{
    ContainerFormat, DownloadOrchestrator, DownloadRequest, DownloaderConfig, Presenter,
    ProgressEvent, Quality, VideoSummary,
};

const USAGE: &str = "Usage:
  video-downloader info <url>
  video-downloader get <url> [-q <quality>] [-f <format>] [-o <dir>]

Qualities: best, worst, 720p, 480p, 360p, 240p, 144p
Formats:   mp4, webm, mkv, mp3, m4a";

/// Prints events to the terminal
#[derive(Default)]
struct TerminalPresenter {
    failed: bool,
    progress_shown: bool,
}

impl TerminalPresenter {
    fn end_progress_line(&mut self) {
        if self.progress_shown {
            println!();
            self.progress_shown = false;
        }
    }
}

impl Presenter for TerminalPresenter {
    fn on_info_ready(&mut self, info: Result<&VideoSummary, &str>) {
        match info {
            Ok(summary) => print!("{}", summary.to_display_text()),
            Err(message) => {
                self.failed = true;
                eprintln!("{}", message);
            }
        }
    }

    fn on_progress(&mut self, progress: &ProgressEvent) {
        match progress.percent {
            Some(percent) => {
                print!("\rProgress: {:5.1}%", percent);
                let _ = std::io::stdout().flush();
                self.progress_shown = true;
            }
            None => {
                self.end_progress_line();
                println!("{}", progress.raw_line);
            }
        }
    }

    fn on_complete(&mut self, success: bool, message: &str) {
        self.end_progress_line();
        if success {
            println!("{}", message);
        } else {
            self.failed = true;
            eprintln!("{}", message);
        }
    }
}

struct GetArgs {
    url: String,
    quality: Quality,
    format: ContainerFormat,
    output_dir: PathBuf,
}

fn parse_get_args(args: &[String], config: &DownloaderConfig) -> Result<GetArgs, String> {
    let mut url = None;
    let mut quality = config.quality;
    let mut format = config.format;
    let mut output_dir = config.output_dir.clone();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-q" | "--quality" => {
                let value = iter.next().ok_or("missing value for --quality")?;
                quality = value.parse().map_err(|e| format!("{e}"))?;
            }
            "-f" | "--format" => {
                let value = iter.next().ok_or("missing value for --format")?;
                format = value.parse().map_err(|e| format!("{e}"))?;
            }
            "-o" | "--output" => {
                let value = iter.next().ok_or("missing value for --output")?;
                output_dir = PathBuf::from(value);
            }
            other if other.starts_with('-') => return Err(format!("unknown option {other}")),
            other if url.is_none() => url = Some(other.to_string()),
            other => return Err(format!("unexpected argument {other}")),
        }
    }

    Ok(GetArgs {
        url: url.ok_or("missing <url>")?,
        quality,
        format,
        output_dir,
    })
}

#[tokio::main]
async fn main() {
    video_downloader::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }

    let config = DownloaderConfig::load();
    let (tx, rx) = channel();

    let started = match args[1].as_str() {
        "info" => DownloadOrchestrator::new(config).fetch_info(&args[2], tx),
        "get" => match parse_get_args(&args[2..], &config) {
            Ok(get) => {
                let request = DownloadRequest::new(get.url, get.quality, get.format, get.output_dir);
                DownloadOrchestrator::new(config).start(request, tx)
            }
            Err(error) => {
                eprintln!("Error: {error}\n\n{USAGE}");
                std::process::exit(1);
            }
        },
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    let handle = match started {
        Ok(handle) => handle,
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    };

    let mut presenter = TerminalPresenter::default();
    run_event_loop(rx, &mut presenter).await;
    let _ = handle.await;

    if presenter.failed {
        std::process::exit(1);
    }
}
