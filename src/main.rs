//! tubeloader - fetch a single stream of a video
//!
//! Resolves the video's formats through the player API, picks one (by itag,
//! quality label, or the default policy) and downloads it with a progress bar.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tubeloader::{
    default_file_name, AppSettings, DownloadProgress, DownloadStatus, SelectionCriteria,
    YouTubeDownloader,
};

#[derive(Parser)]
#[command(name = "tubeloader", version, about = "Download a single video stream")]
struct Args {
    /// Video URL or 11-character video ID
    input: String,

    /// Download the format with this itag
    #[arg(long)]
    itag: Option<u32>,

    /// Download the first format whose quality label matches (exact, then substring)
    #[arg(long, short)]
    quality: Option<String>,

    /// Output file (defaults to "<title>.<ext>" in the download directory)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Print the available formats and exit
    #[arg(long)]
    list_formats: bool,

    /// Proxy URL to rotate through on rate limiting (repeatable)
    #[arg(long = "proxy")]
    proxies: Vec<String>,

    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = AppSettings::load_or_default(args.config.as_deref())
        .context("Failed to load settings")?;
    if !args.proxies.is_empty() {
        settings.proxies = args.proxies.clone();
    }

    let downloader = YouTubeDownloader::from_settings(&args.input, &settings)
        .context("Failed to initialise downloader")?;

    if args.list_formats {
        return list_formats(&downloader).await;
    }

    let criteria = SelectionCriteria {
        id: args.itag,
        quality: args.quality.clone(),
    };
    let selection = downloader.prepare(&criteria).await?;
    let output = args.output.clone().unwrap_or_else(|| {
        settings.download_location.join(default_file_name(
            selection.metadata.title(),
            downloader.video_id(),
            &selection.format,
        ))
    });

    let bar = progress_bar(
        selection.format.size_bytes,
        format!("{} [{}]", output.display(), selection.format.quality),
    );
    let (progress_tx, progress_rx) = mpsc::channel::<DownloadProgress>(100);
    let reporter = tokio::spawn(report_progress(bar.clone(), progress_rx));

    let result = downloader
        .download_format_to_file(&selection.format, &output, Some(progress_tx))
        .await;
    // The sender was moved into the download; the reporter ends once it is dropped.
    let _ = reporter.await;

    let outcome = result.with_context(|| format!("Failed to download {}", downloader.video_id()))?;
    println!("{} ({} bytes)", output.display(), outcome.bytes_written);
    Ok(())
}

async fn list_formats(downloader: &YouTubeDownloader) -> Result<()> {
    let formats = downloader.get_formats().await?;
    if formats.is_empty() {
        println!("No downloadable formats found");
        return Ok(());
    }

    println!("{:>6}  {:<10}  {:<12}  {:<12}  {:>12}", "itag", "quality", "mime", "kind", "size");
    for f in &formats {
        println!(
            "{:>6}  {:<10}  {:<12}  {:<12}  {:>12}",
            f.id,
            f.quality,
            f.mime_type,
            f.kind(),
            f.size_bytes.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

fn progress_bar(total: Option<u64>, label: String) -> ProgressBar {
    let bar = match total {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    let style = match total {
        Some(_) => ProgressStyle::with_template(
            "{msg} {wide_bar} {bytes}/{total_bytes} [{bytes_per_sec}, {elapsed}<{eta}]",
        ),
        None => ProgressStyle::with_template("{msg} {spinner} {bytes} [{bytes_per_sec}, {elapsed}]"),
    };
    if let Ok(style) = style {
        bar.set_style(style);
    }
    bar.set_message(label);
    bar
}

async fn report_progress(bar: ProgressBar, mut progress_rx: mpsc::Receiver<DownloadProgress>) {
    while let Some(progress) = progress_rx.recv().await {
        match &progress.status {
            DownloadStatus::Connecting => {}
            DownloadStatus::Downloading => {
                if let Some(total) = progress.total_bytes {
                    if bar.length() != Some(total) {
                        bar.set_length(total);
                    }
                }
                bar.inc(progress.chunk_bytes);
            }
            DownloadStatus::Completed => bar.finish(),
            DownloadStatus::Failed(msg) => {
                let at = progress
                    .percentage()
                    .map(|fraction| format!(" at {:.0}%", fraction * 100.0))
                    .unwrap_or_default();
                bar.abandon_with_message(format!("failed{}: {}", at, msg));
            }
        }
    }
}
