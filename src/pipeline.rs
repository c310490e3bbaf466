#![forbid(unsafe_code)]

//! Channel video retrieval and ranking.
//!
//! Stages run strictly in order because each needs the previous one's output:
//!
//! 1. resolve the channel (search by name, or trust the given id),
//! 2. resolve its uploads playlist,
//! 3. page through the playlist for every video id,
//! 4. fetch details in chunks of 50 (dropping Shorts and too-short videos),
//! 5. keyword filter, sort, and truncate.
//!
//! The cancellation token attached to the client is checked between stages and
//! raced against every request; a cancelled run yields `PipelineError::Cancelled`
//! and no partial list.

use crate::api::YouTubeClient;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{ChannelInput, ChannelRef, FilterSortConfig, VideoSummary};
use crate::ranking;
use crate::transport::Transport;
use log::info;

/// Turns caller input into a `ChannelRef`. Ids are used as-is without a
/// network call.
pub async fn resolve_channel<T: Transport>(
    client: &YouTubeClient<T>,
    input: &ChannelInput,
) -> PipelineResult<ChannelRef> {
    client.ensure_active()?;
    match input {
        ChannelInput::Id(id) => {
            let id = id.trim();
            if id.is_empty() {
                return Err(PipelineError::invalid_input("channel id is empty"));
            }
            Ok(ChannelRef {
                id: id.to_string(),
                display_name: id.to_string(),
            })
        }
        ChannelInput::Name(name) => {
            let channel = client.search_channel(name).await?;
            info!(
                "resolved channel {name:?} to {} ({})",
                channel.display_name, channel.id
            );
            Ok(channel)
        }
    }
}

/// Stages 2 through 5 for an already resolved channel.
pub async fn list_channel_videos<T: Transport>(
    client: &YouTubeClient<T>,
    channel: &ChannelRef,
    config: &FilterSortConfig,
) -> PipelineResult<Vec<VideoSummary>> {
    config.validate()?;
    if channel.id.trim().is_empty() {
        return Err(PipelineError::invalid_input("channel id is empty"));
    }

    client.ensure_active()?;
    let uploads = client.uploads_playlist_id(&channel.id).await?;

    client.ensure_active()?;
    let video_ids = client.playlist_video_ids(&uploads).await?;
    info!(
        "channel {} lists {} uploads in {uploads}",
        channel.id,
        video_ids.len()
    );

    client.ensure_active()?;
    let details = client.video_details(&video_ids, config).await?;
    info!(
        "{} of {} videos pass the duration filter",
        details.len(),
        video_ids.len()
    );

    client.ensure_active()?;
    let ranked = rank(details, config);
    info!(
        "returning {} videos ordered {}",
        ranked.len(),
        config.order
    );
    Ok(ranked)
}

fn rank(details: Vec<VideoSummary>, config: &FilterSortConfig) -> Vec<VideoSummary> {
    ranking::rank_videos(details, config, &mut rand::thread_rng())
}

/// Pipeline entry point: channel name or id plus configuration in, ordered and
/// capped video list out.
pub async fn fetch_channel_videos<T: Transport>(
    client: &YouTubeClient<T>,
    input: &ChannelInput,
    config: &FilterSortConfig,
) -> PipelineResult<Vec<VideoSummary>> {
    config.validate()?;
    let channel = resolve_channel(client, input).await?;
    list_channel_videos(client, &channel, config).await
}
