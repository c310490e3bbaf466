#![forbid(unsafe_code)]

//! Command-line caller for the ranking pipeline: resolves a channel, lists its
//! uploads with the requested filters and order, then prints them or hands the
//! ids to the download script.

use anyhow::{Context, Result, anyhow};
use clap::{ArgGroup, Parser};
use log::warn;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tubesort::config::{SettingsOverrides, resolve_api_settings};
use tubesort::duration::format_duration;
use tubesort::handoff::{find_download_script, join_ids, run_download_script, video_ids};
use tubesort::{
    ChannelInput, FilterSortConfig, PipelineError, SortOrder, UpstreamKind, UreqTransport,
    VideoSummary, YouTubeClient, list_channel_videos, resolve_channel,
};

#[derive(Debug, Parser)]
#[command(
    name = "channel_videos",
    version,
    about = "List, filter, and rank a YouTube channel's uploads"
)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["channel", "channel_id", "channel_name"])
))]
struct Cli {
    /// Channel id (UC...) or a channel name to search for
    channel: Option<String>,
    /// Channel id, used without a search call
    #[arg(long)]
    channel_id: Option<String>,
    /// Channel name; the first search hit is used
    #[arg(long)]
    channel_name: Option<String>,
    /// newest, oldest, year-asc, year-desc, longest, shortest, random
    #[arg(long, default_value = "newest", value_parser = parse_sort_order)]
    order: SortOrder,
    /// Case-insensitive substring matched against title or description
    #[arg(long)]
    keyword: Option<String>,
    /// Drop videos shorter than this many minutes
    #[arg(long)]
    min_minutes: Option<f64>,
    /// Keep Shorts (60 seconds or less)
    #[arg(long)]
    include_shorts: bool,
    /// Cap on the number of videos returned
    #[arg(long)]
    max_results: Option<usize>,
    #[arg(long)]
    api_key: Option<String>,
    /// Data API base URL
    #[arg(long)]
    api_base: Option<String>,
    #[arg(long)]
    env_file: Option<PathBuf>,
    /// Print only the comma-joined ids
    #[arg(long, conflicts_with = "json")]
    ids: bool,
    #[arg(long)]
    json: bool,
    /// Pass the ids to the download script after listing
    #[arg(long)]
    download: bool,
    #[arg(long)]
    download_script: Option<PathBuf>,
}

fn parse_sort_order(value: &str) -> Result<SortOrder, String> {
    value.parse().map_err(|err: PipelineError| err.to_string())
}

impl Cli {
    fn channel_input(&self) -> Result<ChannelInput> {
        if let Some(id) = &self.channel_id {
            return Ok(ChannelInput::Id(id.clone()));
        }
        if let Some(name) = &self.channel_name {
            return Ok(ChannelInput::Name(name.clone()));
        }
        self.channel
            .as_deref()
            .map(ChannelInput::guess)
            .ok_or_else(|| anyhow!("a channel id or name is required"))
    }

    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            max_results: self.max_results,
            timeout_secs: None,
            download_script: self.download_script.clone(),
            env_path: self.env_file.clone(),
        }
    }

    fn filter_config(&self, max_results: usize) -> FilterSortConfig {
        FilterSortConfig {
            order: self.order,
            keyword: self
                .keyword
                .as_deref()
                .map(str::trim)
                .filter(|keyword| !keyword.is_empty())
                .map(str::to_string),
            min_duration_minutes: self.min_minutes,
            include_shorts: self.include_shorts,
            max_results,
        }
    }
}

/// Conventional status for a run stopped by SIGINT.
const CANCELLED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        // A cancelled ureq call may still hold a blocking-pool thread until its
        // timeout; dropping the runtime would wait for it.
        Err(err) if is_cancelled(&err) => {
            eprintln!("Cancelled.");
            std::process::exit(CANCELLED_EXIT_CODE);
        }
        result => result,
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Cancelled)
    )
}

async fn run(cli: Cli) -> Result<()> {
    let settings = resolve_api_settings(cli.overrides())?;
    let config = cli.filter_config(settings.max_results);
    let target = cli.channel_input()?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let transport = UreqTransport::new(settings.api_base.clone(), settings.timeout);
    let client = YouTubeClient::new(transport, settings.api_key.clone())
        .map_err(explain)?
        .with_cancellation(cancel);

    let channel = resolve_channel(&client, &target).await.map_err(explain)?;
    let videos = list_channel_videos(&client, &channel, &config)
        .await
        .map_err(explain)
        .with_context(|| format!("listing videos of {}", channel.display_name))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&videos)?);
    } else if cli.ids {
        println!("{}", join_ids(&video_ids(&videos)));
    } else {
        print_table(&channel.display_name, config.order, &videos);
    }

    if cli.download {
        let script = find_download_script(settings.download_script.as_deref())?;
        let ids = video_ids(&videos);
        tokio::task::spawn_blocking(move || run_download_script(&script, &ids))
            .await
            .context("waiting for download script")??;
    }

    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            warn!("interrupt received; cancelling");
            cancel.cancel();
        }
        Err(err) => eprintln!("Failed to install Ctrl+C handler: {}", err),
    }
}

/// Adds a user-facing hint for the failures users can act on.
fn explain(err: PipelineError) -> anyhow::Error {
    let hint = match err.upstream_kind() {
        Some(UpstreamKind::InvalidApiKey) => {
            Some("check YOUTUBE_API_KEY; the key was rejected as invalid or expired")
        }
        Some(UpstreamKind::QuotaExceeded) => {
            Some("the daily Data API quota is used up; try again after it resets")
        }
        _ => None,
    };
    match hint {
        Some(hint) => anyhow::Error::new(err).context(hint),
        None => anyhow::Error::new(err),
    }
}

fn print_table(channel: &str, order: SortOrder, videos: &[VideoSummary]) {
    if videos.is_empty() {
        println!("No videos found for channel: {channel}");
        return;
    }

    println!("{} video(s) from {channel}, ordered {order}:", videos.len());
    println!();
    for (index, video) in videos.iter().enumerate() {
        println!(
            "{:>3}. {}  {:>8}  {}  {}",
            index + 1,
            published_date(&video.published_at),
            format_duration(video.duration_seconds),
            video.id,
            video.title
        );
    }
}

/// `2024-01-02T03:04:05Z` becomes `2024-01-02`; anything else is shown as-is.
fn published_date(value: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(value.trim())
        .map(|datetime| datetime.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| value.to_string())
}
